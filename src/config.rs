use crate::extraction::OutputSchema;
use crate::fetchers::FetchStrategy;
use crate::normalize::NormalizationPolicy;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractConfig {
    /// LLM endpoint settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// How pages are retrieved
    #[serde(default)]
    pub fetch: FetchConfig,
    /// JSON shape requested from the model
    #[serde(default)]
    pub schema: OutputSchema,
    /// Quantity handling rules applied after extraction
    #[serde(default)]
    pub normalization: NormalizationPolicy,
    /// Where extracted recipes are written
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Settings for the chat-completions endpoint
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// API key (falls back to OPENAI_API_KEY)
    pub api_key: Option<String>,
    /// Base URL for the API endpoint (for proxies or local gateways)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature; provider default when unset
    pub temperature: Option<f32>,
    /// Maximum tokens to generate; provider default when unset
    pub max_tokens: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl ProviderConfig {
    /// The configured key, or OPENAI_API_KEY from the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FetchConfig {
    #[serde(default)]
    pub strategy: FetchStrategy,
    /// Request timeout in seconds; library default when unset
    pub timeout_secs: Option<u64>,
    /// Chrome/Chromium binary for rendered fetches; auto-detected when unset
    pub chrome_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// SQLite database file; persistence is skipped when unset
    pub database: Option<PathBuf>,
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo-1106".to_string()
}

impl ExtractConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_EXTRACT__ prefix
    /// 2. The given file, or recipe-extract.toml in the current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_EXTRACT__PROVIDER__MODEL
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("recipe-extract").required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("RECIPE_EXTRACT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Parse configuration from a TOML string, without consulting the environment
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
