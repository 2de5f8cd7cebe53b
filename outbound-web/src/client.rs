//! HTTP fetch client
//!
//! Probing and fetching go through the [`Fetcher`] trait. Failures are
//! reported as values ([`ProbeOutcome::Failed`], [`WebError`]) so callers can
//! log them and move on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Errors from the web layer
#[derive(Debug, Error)]
pub enum WebError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

/// Result of a single HEAD probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Status below 400; carries the final URL after redirects
    Hit(Url),
    /// Server answered with status 400 or above
    Miss(u16),
    /// Timeout, connection error or similar
    Failed(String),
}

/// A fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    /// URL after redirects
    pub final_url: Url,
    pub body: String,
}

/// HEAD/GET access to the web
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a HEAD request, following redirects
    async fn head(&self, url: &Url, timeout: Duration) -> ProbeOutcome;

    /// GET a page; non-2xx statuses are errors
    async fn get(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, WebError>;
}

/// Thread-safe reference to a fetcher
pub type SharedFetcher = Arc<dyn Fetcher>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Default request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_redirects: 10,
        }
    }
}

/// User agents for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:137.0) Gecko/20100101 Firefox/137.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:137.0) Gecko/20100101 Firefox/137.0",
];

/// Get a random user agent
pub fn random_user_agent() -> &'static str {
    use rand::Rng;
    let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// Create a plain HTTP client that follows redirects
pub fn create_http_client(config: &HttpConfig) -> Result<Client, WebError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .user_agent(random_user_agent())
        .build()
        .map_err(|e| WebError::ClientBuild(e.to_string()))
}

/// reqwest-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, WebError> {
        Ok(Self {
            client: create_http_client(config)?,
        })
    }

    pub fn shared(config: &HttpConfig) -> Result<SharedFetcher, WebError> {
        Ok(Arc::new(Self::new(config)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn head(&self, url: &Url, timeout: Duration) -> ProbeOutcome {
        match self.client.head(url.clone()).timeout(timeout).send().await {
            Ok(response) => {
                let status = response.status();
                if status.as_u16() < 400 {
                    ProbeOutcome::Hit(response.url().clone())
                } else {
                    ProbeOutcome::Miss(status.as_u16())
                }
            }
            Err(e) if e.is_timeout() => ProbeOutcome::Failed(format!("timeout after {:?}", timeout)),
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        }
    }

    async fn get(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, WebError> {
        debug!("Fetching: {}", url);

        let response = self.client.get(url.clone()).timeout(timeout).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(WebError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await?;

        Ok(FetchedPage {
            status: status.as_u16(),
            final_url,
            body,
        })
    }
}
