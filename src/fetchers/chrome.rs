use super::PageFetcher;
use crate::error::ExtractError;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info};
use reqwest::Url;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

/// Renders pages in headless Chrome for sites that build their content with scripts
pub struct ChromeFetcher {
    chrome_path: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ChromeFetcher {
    pub fn new(chrome_path: Option<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            chrome_path,
            timeout,
        }
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, ExtractError> {
        let url = url.to_string();
        let chrome_path = self.chrome_path.clone().or_else(chrome_from_env);
        let timeout = self.timeout;

        // headless_chrome drives the browser through a blocking API
        tokio::task::spawn_blocking(move || render(&url, chrome_path, timeout))
            .await
            .map_err(|e| ExtractError::Browser(e.to_string()))?
    }
}

fn chrome_from_env() -> Option<PathBuf> {
    std::env::var_os("CHROME")
        .map(PathBuf::from)
        .filter(|path| path.exists())
}

fn render(
    url: &str,
    chrome_path: Option<PathBuf>,
    timeout: Option<Duration>,
) -> Result<String, ExtractError> {
    if let Some(ref path) = chrome_path {
        info!("Using Chrome at {}", path.display());
    }

    let mut builder = LaunchOptions::default_builder();
    builder
        .args(vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
        ])
        .path(chrome_path);
    let options = builder
        .build()
        .map_err(|e| ExtractError::Browser(e.to_string()))?;

    let browser = Browser::new(options).map_err(browser_error)?;
    let tab = browser.new_tab().map_err(browser_error)?;
    if let Some(timeout) = timeout {
        tab.set_default_timeout(timeout);
    }

    debug!("Rendering {url}");
    tab.navigate_to(url)
        .map_err(browser_error)?
        .wait_until_navigated()
        .map_err(browser_error)?;

    let html = tab.get_content().map_err(browser_error)?;
    debug!("Rendered {} bytes from {url}", html.len());
    Ok(html)
}

fn browser_error(err: impl std::fmt::Display) -> ExtractError {
    ExtractError::Browser(err.to_string())
}
