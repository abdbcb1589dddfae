use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Canonical unit of an ingredient quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Grams,
    Milliliters,
    /// Neither mass nor volume, or not convertible
    #[default]
    Unknown,
}

impl Unit {
    /// Short code used by the persisted form
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Unit::Grams => Some("g"),
            Unit::Milliliters => Some("ml"),
            Unit::Unknown => None,
        }
    }

    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("g") => Unit::Grams,
            Some("ml") => Unit::Milliliters,
            _ => Unit::Unknown,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Grams => write!(f, "grams"),
            Unit::Milliliters => write!(f, "milliliters"),
            Unit::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub text: String,
}

/// A recipe in the custom extraction shape.
///
/// Ingredients and steps keep the order in which they appear in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub prep_time_minutes: u32,
}

/// Outcome of a single model extraction
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult<T = Recipe> {
    Found(T),
    NotFound,
}

impl<T> ExtractionResult<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            ExtractionResult::Found(value) => Some(value),
            ExtractionResult::NotFound => None,
        }
    }
}

/// What the pipeline hands back to its caller.
///
/// A schema.org object (found on the page or produced by the model) is kept
/// as loose JSON and never coerced into the custom [`Recipe`] shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecipeDocument {
    Custom(Recipe),
    SchemaOrg(Value),
}

impl RecipeDocument {
    pub fn name(&self) -> Option<&str> {
        match self {
            RecipeDocument::Custom(recipe) => Some(&recipe.name),
            RecipeDocument::SchemaOrg(value) => value.get("name").and_then(Value::as_str),
        }
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
