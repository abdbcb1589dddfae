use crate::error::ExtractError;
use crate::model::{ExtractionResult, Ingredient, Recipe, RecipeDocument, Step};
use crate::normalize::{parse_quantity_text, Normalizer};
use crate::providers::{build_system_prompt, LlmProvider, PROMPT_VERSION};
use log::{debug, info};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// JSON shape requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputSchema {
    /// name / ingredients / steps / time with canonical units
    #[default]
    Custom,
    /// A schema.org Recipe object
    SchemaOrg,
}

impl FromStr for OutputSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "custom" => Ok(OutputSchema::Custom),
            "schema-org" | "schema_org" | "schemaorg" => Ok(OutputSchema::SchemaOrg),
            other => Err(format!("unknown output schema: {other}")),
        }
    }
}

impl fmt::Display for OutputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSchema::Custom => write!(f, "custom"),
            OutputSchema::SchemaOrg => write!(f, "schema-org"),
        }
    }
}

/// Asks an LLM to pull a recipe out of page text.
///
/// Every call costs one model request, so callers check the page for
/// structured data first.
pub struct RecipeExtractor {
    provider: Box<dyn LlmProvider>,
    schema: OutputSchema,
    normalizer: Normalizer,
}

impl RecipeExtractor {
    pub fn new(provider: Box<dyn LlmProvider>, schema: OutputSchema, normalizer: Normalizer) -> Self {
        Self {
            provider,
            schema,
            normalizer,
        }
    }

    pub fn schema(&self) -> OutputSchema {
        self.schema
    }

    /// Extract in whichever shape this extractor was configured for
    pub async fn extract(
        &self,
        page_text: &str,
    ) -> Result<ExtractionResult<RecipeDocument>, ExtractError> {
        Ok(match self.schema {
            OutputSchema::Custom => match self.extract_recipe(page_text).await? {
                ExtractionResult::Found(recipe) => {
                    ExtractionResult::Found(RecipeDocument::Custom(recipe))
                }
                ExtractionResult::NotFound => ExtractionResult::NotFound,
            },
            OutputSchema::SchemaOrg => match self.extract_schema_org(page_text).await? {
                ExtractionResult::Found(value) => {
                    ExtractionResult::Found(RecipeDocument::SchemaOrg(value))
                }
                ExtractionResult::NotFound => ExtractionResult::NotFound,
            },
        })
    }

    /// Extract a recipe in the custom shape
    pub async fn extract_recipe(
        &self,
        page_text: &str,
    ) -> Result<ExtractionResult<Recipe>, ExtractError> {
        let content = self.request(OutputSchema::Custom, page_text).await?;
        parse_recipe_reply(&content, &self.normalizer)
    }

    /// Extract a recipe as a schema.org object
    pub async fn extract_schema_org(
        &self,
        page_text: &str,
    ) -> Result<ExtractionResult<Value>, ExtractError> {
        let content = self.request(OutputSchema::SchemaOrg, page_text).await?;
        parse_schema_org_reply(&content)
    }

    async fn request(&self, schema: OutputSchema, page_text: &str) -> Result<String, ExtractError> {
        let system = build_system_prompt(schema, self.normalizer.policy().quantity);
        info!(
            "Requesting {schema} extraction from {} (prompt {PROMPT_VERSION}, {} chars of text)",
            self.provider.provider_name(),
            page_text.len()
        );
        let content = self.provider.complete_json(&system, page_text).await?;
        debug!("Model reply: {content}");
        Ok(content)
    }
}

#[derive(Debug, Deserialize)]
struct WireRecipe {
    name: String,
    ingredients: Vec<WireIngredient>,
    steps: Vec<WireStep>,
    time: WireNumber,
}

#[derive(Debug, Deserialize)]
struct WireIngredient {
    name: String,
    #[serde(default)]
    quantity: Option<WireNumber>,
    #[serde(default)]
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStep {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Number(f64),
    Text(String),
}

impl WireNumber {
    fn value(&self, field: &str) -> Result<f64, ExtractError> {
        let value = match self {
            WireNumber::Number(n) => Some(*n),
            WireNumber::Text(text) => parse_quantity_text(text),
        };
        match value {
            Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => Err(ExtractError::malformed(format!(
                "{field} is not a non-negative number: {self:?}"
            ))),
        }
    }
}

/// Pull the `recipe` member out of a model reply; `None` means the model found nothing
fn recipe_member(content: &str) -> Result<Option<Value>, ExtractError> {
    let mut reply: Map<String, Value> = match serde_json::from_str(content)? {
        Value::Object(map) => map,
        _ => return Err(ExtractError::malformed("reply is not a JSON object")),
    };

    match reply.remove("recipe") {
        None => Err(ExtractError::malformed("reply has no \"recipe\" field")),
        Some(Value::Null) => Ok(None),
        Some(recipe) => Ok(Some(recipe)),
    }
}

/// Validate and normalise a custom-shape reply
pub fn parse_recipe_reply(
    content: &str,
    normalizer: &Normalizer,
) -> Result<ExtractionResult<Recipe>, ExtractError> {
    let Some(recipe) = recipe_member(content)? else {
        return Ok(ExtractionResult::NotFound);
    };
    let wire: WireRecipe = serde_json::from_value(recipe)?;

    let ingredients = wire
        .ingredients
        .into_iter()
        .map(|ingredient| -> Result<Ingredient, ExtractError> {
            let quantity = ingredient
                .quantity
                .map(|q| q.value("ingredient quantity"))
                .transpose()?;
            let normalized =
                normalizer.ingredient(&ingredient.name, quantity, ingredient.unit.as_deref());
            if normalized.name.is_empty() {
                return Err(ExtractError::malformed(format!(
                    "ingredient has no name besides its quantity: {:?}",
                    ingredient.name
                )));
            }
            Ok(normalized)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let steps = wire
        .steps
        .into_iter()
        .map(|step| Step {
            text: step.text.trim().to_string(),
        })
        .collect();

    let minutes = wire.time.value("time")?.round();
    if minutes > u32::MAX as f64 {
        return Err(ExtractError::malformed(format!("time out of range: {minutes}")));
    }

    Ok(ExtractionResult::Found(Recipe {
        name: wire.name.trim().to_string(),
        ingredients,
        steps,
        prep_time_minutes: minutes as u32,
    }))
}

/// Validate a schema.org-shape reply, filling in `@context` and `@type` when absent
pub fn parse_schema_org_reply(content: &str) -> Result<ExtractionResult<Value>, ExtractError> {
    let Some(recipe) = recipe_member(content)? else {
        return Ok(ExtractionResult::NotFound);
    };
    let Value::Object(mut recipe) = recipe else {
        return Err(ExtractError::malformed("\"recipe\" is not an object"));
    };

    if !recipe.get("name").is_some_and(Value::is_string) {
        return Err(ExtractError::malformed("schema.org recipe has no name"));
    }
    match recipe.get("@type") {
        None => {
            recipe.insert("@type".to_string(), Value::from("Recipe"));
        }
        Some(Value::String(t)) if t.eq_ignore_ascii_case("Recipe") => {}
        Some(other) => {
            return Err(ExtractError::malformed(format!(
                "schema.org object has @type {other}, expected Recipe"
            )))
        }
    }
    recipe
        .entry("@context")
        .or_insert_with(|| Value::from("https://schema.org"));

    Ok(ExtractionResult::Found(Value::Object(recipe)))
}
