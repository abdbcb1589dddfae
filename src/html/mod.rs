//! HTML handling: locating embedded structured data and flattening a page to text.

mod scanner;
mod text;

pub use scanner::{scan_document, scan_for_recipe_schema};
pub use text::{extract_document_text, extract_visible_text};
