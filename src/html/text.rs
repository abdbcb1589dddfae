use scraper::{ElementRef, Html, Node};

/// Flatten an HTML page to its visible text, in document order.
///
/// Markup, scripts, styles and hidden elements are dropped. Block-level
/// boundaries become line breaks; no other structure survives.
pub fn extract_visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    extract_document_text(&document)
}

pub fn extract_document_text(document: &Html) -> String {
    let mut pieces = Vec::new();
    collect_text(&document.root_element(), &mut pieces);

    let mut lines = Vec::new();
    let mut current = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Text(text) => current.push(text),
            Piece::Break => flush_line(&mut current, &mut lines),
        }
    }
    flush_line(&mut current, &mut lines);

    lines.join("\n")
}

enum Piece {
    Text(String),
    Break,
}

fn flush_line(current: &mut Vec<String>, lines: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    // Adjacent text nodes touch unless the source put whitespace between them
    let merged = collapse_whitespace(&current.concat());
    let merged = merged.trim();
    if !merged.is_empty() {
        lines.push(merged.to_string());
    }
    current.clear();
}

fn collect_text(element: &ElementRef, pieces: &mut Vec<Piece>) {
    if is_hidden(element) || should_skip_element(element) {
        return;
    }

    let tag_name = element.value().name().to_ascii_lowercase();
    if tag_name == "br" {
        pieces.push(Piece::Break);
        return;
    }

    let block = is_block_element(&tag_name);
    if block {
        pieces.push(Piece::Break);
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if !text.is_empty() {
                    pieces.push(Piece::Text(collapse_whitespace(text)));
                }
            }
            Node::Element(_) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(&child_ref, pieces);
                }
            }
            _ => {}
        }
    }

    if block {
        pieces.push(Piece::Break);
    }
}

fn is_hidden(element: &ElementRef) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    value
        .attr("style")
        .map(|style| {
            let compact: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            compact.contains("display:none") || compact.contains("visibility:hidden")
        })
        .unwrap_or(false)
}

fn should_skip_element(element: &ElementRef) -> bool {
    matches!(
        element.value().name().to_ascii_lowercase().as_str(),
        "script" | "style" | "noscript" | "template" | "iframe" | "canvas" | "svg"
    )
}

fn is_block_element(tag: &str) -> bool {
    matches!(
        tag,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "dd"
            | "div"
            | "dl"
            | "dt"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "li"
            | "main"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "title"
            | "tr"
            | "ul"
    )
}

fn collapse_whitespace(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                collapsed.push(' ');
            }
            in_space = true;
        } else {
            collapsed.push(c);
            in_space = false;
        }
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_order_and_blocks() {
        let html = r#"
            <html>
                <head><title>Pasta Night</title></head>
                <body>
                    <h1>Pasta Recipe</h1>
                    <ul><li>200 g pasta</li><li>1 jar <b>tomato</b> sauce</li></ul>
                    <p>Cook pasta with sauce</p>
                </body>
            </html>
        "#;

        let text = extract_visible_text(html);
        assert_eq!(
            text,
            "Pasta Night\nPasta Recipe\n200 g pasta\n1 jar tomato sauce\nCook pasta with sauce"
        );
    }

    #[test]
    fn test_inline_elements_share_a_line() {
        let text = extract_visible_text("<div>Hello</div><span>big</span> <span>World</span>");
        assert_eq!(text, "Hello\nbig World");
    }

    #[test]
    fn test_inline_markup_inside_words() {
        assert_eq!(extract_visible_text("<p>Hel<b>lo</b> there</p>"), "Hello there");
        assert_eq!(extract_visible_text("<p>1<sup>1</sup> cups</p>"), "11 cups");
        assert_eq!(
            extract_visible_text("<p>Add <em>two</em>\n   <strong>eggs</strong></p>"),
            "Add two eggs"
        );
    }

    #[test]
    fn test_hidden_elements() {
        let html = r#"
            <div>Visible</div>
            <div hidden>Hidden</div>
            <div style="display: none">Also Hidden</div>
            <div style="VISIBILITY:hidden">Invisible</div>
        "#;
        assert_eq!(extract_visible_text(html), "Visible");
    }

    #[test]
    fn test_skip_script_and_style() {
        let html = r#"
            <div>Visible content</div>
            <script>console.log('Skip this');</script>
            <script type="application/ld+json">{"@type": "Recipe"}</script>
            <style>body { color: red; }</style>
            <div>More content</div>
        "#;
        assert_eq!(extract_visible_text(html), "Visible content\nMore content");
    }

    #[test]
    fn test_entities_decoded_and_line_breaks() {
        let text = extract_visible_text("<p>Salt &amp; pepper<br>to taste</p>");
        assert_eq!(text, "Salt & pepper\nto taste");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(extract_visible_text(""), "");
    }
}
