use log::{debug, warn};
use scraper::{Html, Selector};
use serde_json::Value;

/// Return the first JSON-LD object on the page whose `@type` is `Recipe`.
///
/// Blocks that fail to parse are logged and skipped.
pub fn scan_for_recipe_schema(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    scan_document(&document)
}

pub fn scan_document(document: &Html) -> Option<Value> {
    let selector = Selector::parse("script[type]").ok()?;

    for (index, script) in document
        .select(&selector)
        .filter(|script| is_json_ld(script.value().attr("type")))
        .enumerate()
    {
        let raw = script.text().collect::<String>();
        let json_ld = match parse_block(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!("Skipping unparseable JSON-LD block #{index}: {err}");
                continue;
            }
        };

        if let Some(recipe) = find_recipe(json_ld) {
            debug!("Found Recipe in JSON-LD block #{index}");
            return Some(recipe);
        }
    }

    debug!("No Recipe found in JSON-LD");
    None
}

fn is_json_ld(content_type: Option<&str>) -> bool {
    content_type
        .map(|t| t.trim().to_ascii_lowercase().starts_with("application/ld+json"))
        .unwrap_or(false)
}

fn parse_block(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw).or_else(|err| {
        let cleaned = sanitize_json(raw);
        if cleaned == raw {
            Err(err)
        } else {
            serde_json::from_str(&cleaned)
        }
    })
}

/// Repair the defects sites commonly ship inside JSON-LD blocks
fn sanitize_json(json_str: &str) -> String {
    let mut cleaned = json_str
        .trim()
        .trim_start_matches("<!--")
        .trim_end_matches("-->")
        .trim()
        .to_string();

    // Drop anything before the first object or array
    if !cleaned.starts_with('{') && !cleaned.starts_with('[') {
        if let Some(start) = cleaned.find(['{', '[']) {
            cleaned = cleaned[start..].to_string();
        }
    }

    // Trailing commas before a closing brace/bracket
    cleaned = cleaned.replace(",]", "]").replace(",}", "}");

    // Raw control characters are not allowed inside JSON strings
    cleaned
        .chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect()
}

fn find_recipe(value: Value) -> Option<Value> {
    match value {
        Value::Array(items) => items.into_iter().find_map(find_recipe),
        Value::Object(mut map) => {
            if map.get("@type").is_some_and(is_recipe_type) {
                return Some(Value::Object(map));
            }
            match map.remove("@graph") {
                Some(graph) => find_recipe(graph),
                None => None,
            }
        }
        _ => None,
    }
}

fn is_recipe_type(type_value: &Value) -> bool {
    match type_value {
        Value::String(name) => name == "Recipe",
        Value::Array(names) => names.iter().any(is_recipe_type),
        _ => false,
    }
}
