use crate::extraction::OutputSchema;
use crate::normalize::QuantityPolicy;

/// Bumped whenever either instruction text changes meaning.
pub const PROMPT_VERSION: &str = "2024-01-recipe-v1";

/// Instruction for the custom Recipe/Ingredient/Step shape.
///
/// Loaded from `recipe_prompt.txt` at compile time so the wording can be
/// edited without dealing with Rust string syntax.
pub const RECIPE_EXTRACTION_PROMPT: &str = include_str!("recipe_prompt.txt");

/// Instruction for the schema.org Recipe shape.
pub const SCHEMA_ORG_EXTRACTION_PROMPT: &str = include_str!("schema_org_prompt.txt");

/// Build the system instruction for the requested output shape
pub fn build_system_prompt(schema: OutputSchema, quantity: QuantityPolicy) -> String {
    match schema {
        OutputSchema::Custom => {
            let rule = match quantity {
                QuantityPolicy::Integer => {
                    "Every ingredient quantity must be a whole number; round if necessary."
                }
                QuantityPolicy::Fractional => {
                    "Ingredient quantities may be decimal numbers; write fractions such as 1/2 as 0.5."
                }
            };
            format!("{}\n{}", RECIPE_EXTRACTION_PROMPT.trim_end(), rule)
        }
        OutputSchema::SchemaOrg => SCHEMA_ORG_EXTRACTION_PROMPT.trim_end().to_string(),
    }
}
