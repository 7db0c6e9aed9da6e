//! Page content capability
//!
//! The scraping backend is intentionally opaque: the fetcher only needs
//! the page's visible text plus the set of descriptive attribute
//! strings that mention busyness. [`HttpPageSource`] implements the
//! capability with a plain HTTP client; a headless-browser backend can
//! implement the same trait without touching the pipeline.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Unstructured content fetched for one venue page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// Page text, scanned for live phrase indicators
    pub body_text: String,
    /// Descriptive attribute strings mentioning a busyness percentage,
    /// in document order (e.g. `"62% busy at 7 PM."` or `"Now: 75% busy"`)
    pub busyness_labels: Vec<String>,
}

/// Capability to fetch page text and labeled attributes for a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<PageContent>;
}

#[async_trait]
impl PageSource for std::sync::Arc<dyn PageSource> {
    async fn fetch_page(&self, url: &str) -> Result<PageContent> {
        (**self).fetch_page(url).await
    }
}

static ARIA_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"aria-label="([^"]*)""#).expect("aria-label pattern compiles"));

static BUSY_PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+%\s*busy").expect("busy percent pattern compiles"));

/// reqwest-backed page source.
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Fetch(format!("Cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Pull every busyness-bearing aria-label out of raw page markup.
    fn extract_labels(html: &str) -> Vec<String> {
        ARIA_LABEL
            .captures_iter(html)
            .map(|c| c[1].trim().to_string())
            .filter(|label| BUSY_PERCENT.is_match(label))
            .collect()
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, url: &str) -> Result<PageContent> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned HTTP {}", url, status)));
        }
        let body = response.text().await?;
        let busyness_labels = Self::extract_labels(&body);
        debug!(
            "Fetched {} ({} bytes, {} busyness labels)",
            url,
            body.len(),
            busyness_labels.len()
        );
        Ok(PageContent {
            body_text: body,
            busyness_labels,
        })
    }
}
