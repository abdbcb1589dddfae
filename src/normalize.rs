//! Local post-processing of model-extracted ingredients.
//!
//! The model is asked to convert every mass or volume to grams or
//! milliliters itself. This module does not redo that arithmetic; it only
//! folds metric multiples the model left behind into the canonical unit,
//! maps everything else to [`Unit::Unknown`], and cleans ingredient names.

use crate::model::{Ingredient, Unit};
use serde::Deserialize;

/// Whether quantities are whole numbers or may carry decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityPolicy {
    /// Round to the nearest whole number
    #[default]
    Integer,
    /// Keep up to three decimal places
    Fractional,
}

/// What happens to the quantity of an ingredient whose unit is unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownUnitQuantity {
    /// Retain the raw count ("3 cloves" keeps 3)
    #[default]
    Keep,
    /// Discard it
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct NormalizationPolicy {
    #[serde(default)]
    pub quantity: QuantityPolicy,
    #[serde(default)]
    pub unknown_unit_quantity: UnknownUnitQuantity,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    policy: NormalizationPolicy,
}

impl Normalizer {
    pub fn new(policy: NormalizationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> NormalizationPolicy {
        self.policy
    }

    /// Build a canonical ingredient from the model's name, quantity and unit
    pub fn ingredient(&self, name: &str, quantity: Option<f64>, unit: Option<&str>) -> Ingredient {
        let (unit, factor) = canonical_unit(unit);

        let quantity = match unit {
            Unit::Grams | Unit::Milliliters => quantity.map(|q| q * factor),
            Unit::Unknown => match self.policy.unknown_unit_quantity {
                UnknownUnitQuantity::Keep => quantity,
                UnknownUnitQuantity::Drop => None,
            },
        };

        let quantity = quantity.map(|q| match self.policy.quantity {
            QuantityPolicy::Integer => q.round(),
            QuantityPolicy::Fractional => (q * 1000.0).round() / 1000.0,
        });

        Ingredient {
            name: normalize_name(name),
            quantity,
            unit,
        }
    }
}

/// Map a unit string to its canonical unit and the factor that converts into it
pub fn canonical_unit(raw: Option<&str>) -> (Unit, f64) {
    let Some(raw) = raw else {
        return (Unit::Unknown, 1.0);
    };
    let unit = raw.trim().trim_end_matches('.').to_lowercase();

    match unit.as_str() {
        "g" | "gr" | "gram" | "grams" | "gramme" | "grammes" => (Unit::Grams, 1.0),
        "kg" | "kgs" | "kilo" | "kilos" | "kilogram" | "kilograms" | "kilogramme"
        | "kilogrammes" => (Unit::Grams, 1000.0),
        "mg" | "milligram" | "milligrams" => (Unit::Grams, 0.001),
        "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" | "millileter"
        | "millileters" => (Unit::Milliliters, 1.0),
        "l" | "liter" | "liters" | "litre" | "litres" => (Unit::Milliliters, 1000.0),
        "dl" | "deciliter" | "deciliters" | "decilitre" | "decilitres" => {
            (Unit::Milliliters, 100.0)
        }
        "cl" | "centiliter" | "centiliters" | "centilitre" | "centilitres" => {
            (Unit::Milliliters, 10.0)
        }
        _ => (Unit::Unknown, 1.0),
    }
}

/// Parse a free-text quantity such as "2", "1.5", "1,5", "1,000", "1/2", "1 1/2" or "1½"
pub fn parse_quantity_text(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut total = 0.0;
    for part in text.split_whitespace() {
        total += parse_quantity_token(part)?;
    }
    Some(total)
}

fn parse_quantity_token(token: &str) -> Option<f64> {
    let token = resolve_commas(token);

    // "1½" splits into whole part and vulgar fraction
    if let Some(last) = token.chars().last() {
        if let Some(fraction) = vulgar_fraction(last) {
            let whole = &token[..token.len() - last.len_utf8()];
            let whole = if whole.is_empty() { 0.0 } else { whole.parse::<f64>().ok()? };
            return Some(whole + fraction);
        }
    }

    if let Some((numerator, denominator)) = token.split_once(['/', '⁄']) {
        let numerator = numerator.parse::<f64>().ok()?;
        let denominator = denominator.parse::<f64>().ok()?;
        if denominator == 0.0 {
            return None;
        }
        return Some(numerator / denominator);
    }

    token.parse::<f64>().ok().filter(|q| q.is_finite())
}

/// A comma followed by exactly three digits groups thousands ("2,500");
/// any other comma is a decimal separator ("1,5")
fn resolve_commas(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let mut resolved = String::with_capacity(token.len());
    for (i, &c) in chars.iter().enumerate() {
        if c != ',' {
            resolved.push(c);
            continue;
        }
        let digits = chars[i + 1..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if digits != 3 {
            resolved.push('.');
        }
    }
    resolved
}

fn vulgar_fraction(c: char) -> Option<f64> {
    match c {
        '¼' => Some(0.25),
        '½' => Some(0.5),
        '¾' => Some(0.75),
        '⅓' => Some(1.0 / 3.0),
        '⅔' => Some(2.0 / 3.0),
        '⅕' => Some(0.2),
        '⅛' => Some(0.125),
        '⅜' => Some(0.375),
        '⅝' => Some(0.625),
        '⅞' => Some(0.875),
        _ => None,
    }
}

const UNIT_WORDS: &[&str] = &[
    "g", "gr", "gram", "grams", "kg", "kilogram", "kilograms", "mg", "ml", "milliliter",
    "milliliters", "millilitre", "millilitres", "l", "liter", "liters", "litre", "litres", "dl",
    "cl", "cup", "cups", "tbsp", "tbs", "tablespoon", "tablespoons", "tsp", "teaspoon",
    "teaspoons", "oz", "ounce", "ounces", "lb", "lbs", "pound", "pounds", "pinch", "pinches",
    "dash", "dashes", "clove", "cloves", "can", "cans", "jar", "jars", "handful", "handfuls",
    "slice", "slices", "piece", "pieces", "stick", "sticks", "sprig", "sprigs", "bunch",
    "bunches", "package", "packages", "pkg", "pint", "pints", "quart", "quarts", "of",
];

/// Strip leading quantity and unit words from an ingredient name and capitalize it.
///
/// A name made only of quantity text keeps its unit words ("2 cups" becomes
/// "Cups"); one made only of numbers comes back empty.
pub fn normalize_name(raw: &str) -> String {
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    let skip = tokens
        .iter()
        .take_while(|token| is_quantity_token(token))
        .count();
    // Unit words only count as quantity text when they follow a number
    let skip = if skip > 0 {
        skip + tokens[skip..]
            .iter()
            .take_while(|token| is_unit_word(token))
            .count()
    } else {
        skip
    };

    let kept: Vec<&str> = if skip < tokens.len() {
        tokens[skip..].to_vec()
    } else {
        tokens
            .iter()
            .copied()
            .filter(|token| !is_quantity_token(token) && !token.eq_ignore_ascii_case("of"))
            .collect()
    };
    capitalize(&kept.join(" "))
}

fn is_quantity_token(token: &str) -> bool {
    let token = token.trim_matches(|c| c == '(' || c == ')' || c == ',');
    if token.is_empty() {
        return false;
    }
    if parse_quantity_token(token).is_some() {
        return true;
    }
    // "200g", "1.5kg", "2x"
    let digits_end = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(token.len());
    digits_end > 0 && {
        let suffix = &token[digits_end..];
        suffix.eq_ignore_ascii_case("x") || is_unit_word(suffix)
    }
}

fn is_unit_word(token: &str) -> bool {
    let word = token
        .trim_matches(|c: char| c == '(' || c == ')' || c == ',' || c == '.')
        .to_lowercase();
    UNIT_WORDS.contains(&word.as_str())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
