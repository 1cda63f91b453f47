//! HTTP fetcher implementation
//!
//! Every page the pipeline reads goes through `Fetcher::fetch`:
//! - browser-like request headers, since the origin blocks obvious bots
//! - a generous timeout for a slow origin
//! - up to `max-attempts` tries with a pause between them
//! - no caching; every call hits the network

use crate::config::FetcherConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::{redirect::Policy, Client};
use scraper::Html;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Typed fetch failure
///
/// Callers treat this as "skip this page and continue", never as fatal.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("fetch_exhausted: {url} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

impl FetchError {
    /// Short machine-readable kind, used in logs and audit messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Exhausted { .. } => "fetch_exhausted",
        }
    }
}

/// A successfully fetched page
///
/// Holds the raw body; `document()` parses it on demand. The parsed tree is
/// not `Send`, so callers parse, extract owned data, and drop it before the
/// next await point.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Response body
    pub body: String,
}

impl FetchedPage {
    /// Parses the body into an HTML document
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Base URL for resolving relative links
    pub fn base_url(&self) -> Option<Url> {
        Url::parse(&self.final_url)
            .or_else(|_| Url::parse(&self.url))
            .ok()
    }
}

/// Outcome of a single attempt
#[derive(Debug)]
enum AttemptError {
    Timeout(String),
    Status(u16),
    Network(String),
}

impl AttemptError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Timeout(e) => format!("timeout: {}", e),
            Self::Status(code) => format!("HTTP {}", code),
            Self::Network(e) => e.clone(),
        }
    }
}

/// Builds an HTTP client that looks like a desktop browser
///
/// # Example
///
/// ```no_run
/// use catalog_sync::config::FetcherConfig;
/// use catalog_sync::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9,pt-BR;q=0.8,pt;q=0.7"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    let timeout = Duration::from_secs(config.timeout_secs);

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retrying page fetcher
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
}

impl Fetcher {
    /// Creates a fetcher with its own HTTP client
    pub fn new(config: FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    /// Fetches a URL, retrying on failure
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Timeout | wait `timeout-retry-delay-ms`, retry |
    /// | Connection error / non-2xx | wait `error-retry-delay-ms`, retry |
    /// | Last attempt fails | `FetchError::Exhausted` |
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.try_fetch(url).await {
                Ok(page) => {
                    tracing::debug!("Fetched {} ({} bytes)", url, page.body.len());
                    return Ok(page);
                }
                Err(err) => {
                    last_error = err.describe();
                    tracing::warn!(
                        "Fetch attempt {}/{} for {} failed: {}",
                        attempt,
                        attempts,
                        url,
                        last_error
                    );

                    if attempt < attempts {
                        let delay = match err {
                            AttemptError::Timeout(_) => self.config.timeout_retry_delay_ms,
                            _ => self.config.error_retry_delay_ms,
                        };
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }

    async fn try_fetch(&self, url: &str) -> Result<FetchedPage, AttemptError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AttemptError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(AttemptError::from_reqwest)?;

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status_code: status.as_u16(),
            body,
        })
    }
}
