//! Find the recipe on a web page.
//!
//! A page is fetched (plain HTTP or headless Chrome), scanned for an
//! embedded schema.org `Recipe` in JSON-LD, and only when none exists is its
//! visible text handed to an LLM that extracts a recipe with quantities in
//! grams or milliliters.
//!
//! ```no_run
//! # async fn run() -> Result<(), recipe_extract::ExtractError> {
//! let extraction = recipe_extract::extract_recipe_from_url("https://example.com/pancakes").await?;
//! println!("{}", extraction.document.to_pretty_json()?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extraction;
pub mod fetchers;
pub mod html;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod providers;
pub mod store;

pub use config::ExtractConfig;
pub use error::ExtractError;
pub use extraction::{OutputSchema, RecipeExtractor};
pub use fetchers::{FetchStrategy, PageFetcher};
pub use model::{ExtractionResult, Ingredient, Recipe, RecipeDocument, Step, Unit};
pub use normalize::{NormalizationPolicy, Normalizer, QuantityPolicy, UnknownUnitQuantity};
pub use pipeline::{validate_url, Extraction, Progress, RecipeOrigin, RecipePipeline};
pub use providers::{LlmProvider, OpenAIProvider};
pub use store::{RecipeRecord, RecipeStore, SqliteStore};

use crate::config::FetchConfig;
use serde_json::Value;

/// Fetch the raw HTML of `url` with the given strategy
pub async fn fetch_page(url: &str, strategy: FetchStrategy) -> Result<String, ExtractError> {
    let url = validate_url(url)?;
    let fetcher = fetchers::fetcher_for(&FetchConfig {
        strategy,
        ..FetchConfig::default()
    })?;
    fetcher.fetch(&url).await
}

/// Fetch `url` and return its embedded schema.org Recipe, if any.
///
/// Never calls the model.
pub async fn scan_page(url: &str) -> Result<Option<Value>, ExtractError> {
    let html = fetch_page(url, FetchStrategy::Direct).await?;
    Ok(html::scan_for_recipe_schema(&html))
}

/// Run the full pipeline with configuration from `recipe-extract.toml` and the environment
pub async fn extract_recipe_from_url(url: &str) -> Result<Extraction, ExtractError> {
    let config = ExtractConfig::load(None)?;
    RecipePipeline::builder().config(config).build()?.run(url).await
}
