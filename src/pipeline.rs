use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::extraction::{OutputSchema, RecipeExtractor};
use crate::fetchers::{fetcher_for, FetchStrategy, PageFetcher};
use crate::html::{extract_visible_text, scan_for_recipe_schema};
use crate::model::{ExtractionResult, RecipeDocument};
use crate::normalize::{NormalizationPolicy, Normalizer};
use crate::providers::{LlmProvider, OpenAIProvider};
use crate::store::{RecipeRecord, RecipeStore, SqliteStore};
use config::ConfigError;
use log::{debug, info, warn};
use reqwest::Url;

/// Where the returned recipe came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeOrigin {
    /// A JSON-LD block embedded in the page
    StructuredData,
    /// The LLM read the page text
    Model,
}

/// Result of one successful pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub url: Url,
    pub document: RecipeDocument,
    pub origin: RecipeOrigin,
    /// Row id when the recipe was written to a store
    pub stored_id: Option<i64>,
}

/// Stages reported to a progress callback while a run is under way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<'a> {
    /// The page is being downloaded
    Fetching(&'a Url),
    /// The page text has been sent to the model
    Generating,
}

type ProgressCallback = Box<dyn Fn(Progress<'_>) + Send + Sync>;

/// Check that `source` is an absolute http(s) URL with a host
pub fn validate_url(source: &str) -> Result<Url, ExtractError> {
    let invalid = |reason: &str| ExtractError::Validation {
        url: source.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(source.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

/// Fetch → structured-data scan → visible text → model → store
pub struct RecipePipeline {
    fetcher: Box<dyn PageFetcher>,
    extractor: Option<RecipeExtractor>,
    store: Option<Box<dyn RecipeStore>>,
    progress: Option<ProgressCallback>,
}

impl RecipePipeline {
    pub fn builder() -> RecipePipelineBuilder {
        RecipePipelineBuilder::default()
    }

    pub async fn run(&self, source: &str) -> Result<Extraction, ExtractError> {
        let url = validate_url(source)?;

        self.report(Progress::Fetching(&url));
        let html = self.fetcher.fetch(&url).await?;

        if let Some(schema) = scan_for_recipe_schema(&html) {
            info!("Using embedded schema.org Recipe; no model call needed");
            return Ok(Extraction {
                url,
                document: RecipeDocument::SchemaOrg(schema),
                origin: RecipeOrigin::StructuredData,
                stored_id: None,
            });
        }

        let text = extract_visible_text(&html);
        if text.trim().is_empty() {
            warn!("{url} has no visible text");
            return Err(ExtractError::NotFound);
        }
        debug!("Extracted {} chars of visible text", text.len());

        let extractor = self.extractor.as_ref().ok_or_else(|| {
            ConfigError::Message("OPENAI_API_KEY not found in config or environment".to_string())
        })?;
        // Only custom-shape results are stored, so only they can collide
        if let (OutputSchema::Custom, Some(store)) = (extractor.schema(), &self.store) {
            if store.contains(url.as_str())? {
                return Err(ExtractError::DuplicateSource(url.to_string()));
            }
        }

        self.report(Progress::Generating);
        let document = match extractor.extract(&text).await? {
            ExtractionResult::Found(document) => document,
            ExtractionResult::NotFound => return Err(ExtractError::NotFound),
        };

        let stored_id = match (&document, &self.store) {
            (RecipeDocument::Custom(recipe), Some(store)) => {
                Some(store.save(&RecipeRecord::new(url.as_str(), text, recipe.clone()))?)
            }
            _ => None,
        };

        Ok(Extraction {
            url,
            document,
            origin: RecipeOrigin::Model,
            stored_id,
        })
    }

    fn report(&self, progress: Progress<'_>) {
        match progress {
            Progress::Fetching(url) => debug!("Fetching {url}"),
            Progress::Generating => debug!("Sending page text to the model"),
        }
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

/// Builder for [`RecipePipeline`]
#[derive(Default)]
pub struct RecipePipelineBuilder {
    config: ExtractConfig,
    fetcher: Option<Box<dyn PageFetcher>>,
    provider: Option<Box<dyn LlmProvider>>,
    store: Option<Box<dyn RecipeStore>>,
    progress: Option<ProgressCallback>,
}

impl RecipePipelineBuilder {
    /// Start from a loaded configuration; later calls override it
    pub fn config(mut self, config: ExtractConfig) -> Self {
        self.config = config;
        self
    }

    pub fn fetch_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.config.fetch.strategy = strategy;
        self
    }

    pub fn schema(mut self, schema: OutputSchema) -> Self {
        self.config.schema = schema;
        self
    }

    pub fn normalization(mut self, policy: NormalizationPolicy) -> Self {
        self.config.normalization = policy;
        self
    }

    /// Use a custom page fetcher instead of the configured strategy
    pub fn fetcher(mut self, fetcher: Box<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Use a custom model provider instead of OpenAI
    pub fn provider(mut self, provider: Box<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Persist custom-shape extractions to this store
    pub fn store(mut self, store: Box<dyn RecipeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Call `callback` as the run moves from fetching to generating
    pub fn on_progress(mut self, callback: impl Fn(Progress<'_>) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> Result<RecipePipeline, ExtractError> {
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => fetcher_for(&self.config.fetch)?,
        };

        // A missing API key only matters once the model is actually needed
        let provider = match self.provider {
            Some(provider) => Some(provider),
            None => OpenAIProvider::new(&self.config.provider)
                .ok()
                .map(|p| Box::new(p) as Box<dyn LlmProvider>),
        };

        let store = match (self.store, &self.config.storage.database) {
            (Some(store), _) => Some(store),
            (None, Some(path)) => Some(Box::new(SqliteStore::open(path)?) as Box<dyn RecipeStore>),
            (None, None) => None,
        };

        let normalizer = Normalizer::new(self.config.normalization);
        let extractor =
            provider.map(|provider| RecipeExtractor::new(provider, self.config.schema, normalizer));

        Ok(RecipePipeline {
            fetcher,
            extractor,
            store,
            progress: self.progress,
        })
    }
}
