use crate::config::FetchConfig;
use crate::error::ExtractError;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

mod chrome;
mod request;

pub use chrome::ChromeFetcher;
pub use request::RequestFetcher;

/// Retrieves the raw HTML of a page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, ExtractError>;
}

/// How a page is retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Plain HTTP GET
    #[default]
    Direct,
    /// Load the page in headless Chrome and serialize the rendered DOM
    Rendered,
}

impl FromStr for FetchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(FetchStrategy::Direct),
            "rendered" => Ok(FetchStrategy::Rendered),
            other => Err(format!("unknown fetch strategy: {other}")),
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::Direct => write!(f, "direct"),
            FetchStrategy::Rendered => write!(f, "rendered"),
        }
    }
}

/// Build the fetcher for the configured strategy
pub fn fetcher_for(config: &FetchConfig) -> Result<Box<dyn PageFetcher>, ExtractError> {
    let timeout = config.timeout_secs.map(Duration::from_secs);
    match config.strategy {
        FetchStrategy::Direct => Ok(Box::new(RequestFetcher::new(timeout)?)),
        FetchStrategy::Rendered => Ok(Box::new(ChromeFetcher::new(
            config.chrome_path.clone(),
            timeout,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("direct".parse::<FetchStrategy>(), Ok(FetchStrategy::Direct));
        assert_eq!(" Rendered ".parse::<FetchStrategy>(), Ok(FetchStrategy::Rendered));
        assert!("curl".parse::<FetchStrategy>().is_err());
    }

    #[test]
    fn test_strategy_display_round_trips() {
        for strategy in [FetchStrategy::Direct, FetchStrategy::Rendered] {
            assert_eq!(strategy.to_string().parse::<FetchStrategy>(), Ok(strategy));
        }
    }
}
