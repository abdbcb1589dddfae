use thiserror::Error;

/// Errors that can occur while extracting a recipe from a page
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The supplied source is not a well-formed http(s) URL
    #[error("Invalid URL '{url}': {reason}")]
    Validation { url: String, reason: String },

    /// Network or transport failure while fetching the page or calling the model
    #[error("Failed to fetch URL: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The headless browser could not be launched or failed to render the page
    #[error("Browser rendering failed: {0}")]
    Browser(String),

    /// The LLM endpoint answered with a non-success status
    #[error("Provider request failed with status {status}: {body}")]
    Provider { status: u16, body: String },

    /// The model reported that the page holds no recipe
    #[error("Could not find a recipe at URL")]
    NotFound,

    /// The model reply does not match the requested JSON shape
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Database failure in the recipe store
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A recipe with this source URL has already been stored
    #[error("A recipe from {0} is already stored")]
    DuplicateSource(String),
}

impl ExtractError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ExtractError::MalformedResponse(reason.into())
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        ExtractError::MalformedResponse(err.to_string())
    }
}
