//! Firecrawl API client
//!
//! Renders JavaScript-heavy pages to markdown and HTML. Crawls are
//! asynchronous on Firecrawl's side: start a job, then poll until it
//! completes, fails, or the poll budget runs out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use outbound_core::truncate_chars;

use crate::{random_user_agent, PageScraper, ScrapedPage, WebError};

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1";

/// Paths a people-finding crawl is restricted to (Firecrawl expects regexes)
pub const TEAM_INCLUDE_PATHS: &[&str] = &[
    ".*/team.*",
    ".*/about.*",
    ".*/people.*",
    ".*/leadership.*",
    ".*/staff.*",
    ".*/founder.*",
    ".*/contact.*",
    ".*/our-team.*",
    ".*/meet-the-team.*",
];

/// Firecrawl client configuration
#[derive(Debug, Clone)]
pub struct FirecrawlConfig {
    pub api_key: String,
    /// Base URL (overridable for self-hosted Firecrawl)
    pub base_url: String,
    /// Timeout for a single scrape request
    pub scrape_timeout_secs: u64,
    /// Total time to wait for a crawl job
    pub poll_timeout_secs: u64,
    /// Interval between crawl status checks
    pub poll_interval_secs: u64,
}

impl FirecrawlConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: FIRECRAWL_API_URL.to_string(),
            scrape_timeout_secs: 60,
            poll_timeout_secs: 600,
            poll_interval_secs: 3,
        }
    }
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 2],
}

#[derive(Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    data: Option<PageData>,
}

#[derive(Deserialize)]
struct PageData {
    markdown: Option<String>,
    html: Option<String>,
    metadata: Option<PageMetadata>,
}

#[derive(Deserialize)]
struct PageMetadata {
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
}

#[derive(Serialize)]
struct CrawlRequest<'a> {
    url: &'a str,
    limit: u32,
    #[serde(rename = "scrapeOptions")]
    scrape_options: CrawlScrapeOptions,
    #[serde(rename = "includePaths", skip_serializing_if = "Vec::is_empty")]
    include_paths: Vec<String>,
}

#[derive(Serialize)]
struct CrawlScrapeOptions {
    formats: [&'static str; 2],
}

#[derive(Deserialize)]
struct CrawlStartResponse {
    #[serde(default)]
    success: bool,
    id: Option<String>,
    /// Some deployments answer synchronously with the pages
    data: Option<Vec<PageData>>,
}

#[derive(Deserialize)]
struct CrawlStatusResponse {
    status: String,
    completed: Option<u32>,
    total: Option<u32>,
    data: Option<Vec<PageData>>,
}

/// One page returned by a crawl
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    pub markdown: String,
}

fn scraped_page(data: PageData) -> ScrapedPage {
    ScrapedPage {
        url: data
            .metadata
            .and_then(|m| m.source_url)
            .unwrap_or_default(),
        markdown: data.markdown.unwrap_or_default(),
        html: data.html.unwrap_or_default(),
    }
}

/// Firecrawl REST client
pub struct FirecrawlClient {
    client: Client,
    config: FirecrawlConfig,
}

impl FirecrawlClient {
    pub fn new(config: FirecrawlConfig) -> Result<Self, WebError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.scrape_timeout_secs))
            .user_agent(random_user_agent())
            .build()
            .map_err(|e| WebError::ClientBuild(e.to_string()))?;

        Ok(Self { client, config })
    }

    async fn post<T: Serialize, R: DeserializeOwned>(&self, endpoint: &str, body: &T) -> Result<R, WebError> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WebError::Api(format!("Firecrawl {} {}: {}", endpoint, status, truncate_chars(&text, 500))));
        }

        Ok(response.json().await?)
    }

    async fn get<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, WebError> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WebError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}

/// Multi-page crawling of one site
#[async_trait]
pub trait SiteCrawler: Send + Sync {
    /// Crawl up to `limit` pages under `url`, restricted to `include_paths` regexes when given
    async fn crawl(&self, url: &str, limit: u32, include_paths: &[&str]) -> Result<Vec<CrawledPage>, WebError>;
}

/// Thread-safe reference to a crawler
pub type SharedCrawler = Arc<dyn SiteCrawler>;

#[async_trait]
impl SiteCrawler for FirecrawlClient {
    async fn crawl(&self, url: &str, limit: u32, include_paths: &[&str]) -> Result<Vec<CrawledPage>, WebError> {
        info!("Starting crawl of {} (limit {})", url, limit);

        let request = CrawlRequest {
            url,
            limit,
            scrape_options: CrawlScrapeOptions {
                formats: ["markdown", "html"],
            },
            include_paths: include_paths.iter().map(|p| p.to_string()).collect(),
        };

        let start: CrawlStartResponse = self.post("/crawl", &request).await?;

        let job_id = match (start.success, start.id, start.data) {
            (true, Some(id), _) => id,
            (true, None, Some(data)) => return Ok(crawled_pages(data)),
            _ => return Err(WebError::Api(format!("Firecrawl did not start a crawl for {}", url))),
        };

        info!("Crawl job created: {}", job_id);

        let interval = Duration::from_secs(self.config.poll_interval_secs.max(1));
        let mut waited = Duration::ZERO;
        let budget = Duration::from_secs(self.config.poll_timeout_secs);

        while waited < budget {
            tokio::time::sleep(interval).await;
            waited += interval;

            let status: CrawlStatusResponse = match self.get(&format!("/crawl/{}", job_id)).await {
                Ok(status) => status,
                Err(e) => {
                    warn!("Status check for crawl {} failed: {}", job_id, e);
                    continue;
                }
            };

            match status.status.as_str() {
                "completed" => {
                    let pages = crawled_pages(status.data.unwrap_or_default());
                    info!("Crawl complete: {} pages", pages.len());
                    return Ok(pages);
                }
                "failed" => return Err(WebError::Api(format!("Firecrawl crawl {} failed", job_id))),
                _ => debug!(
                    "Crawling... {}/{} pages",
                    status.completed.unwrap_or(0),
                    status.total.unwrap_or(limit)
                ),
            }
        }

        Err(WebError::Timeout(self.config.poll_timeout_secs))
    }
}

#[async_trait]
impl PageScraper for FirecrawlClient {
    async fn scrape(&self, url: &Url) -> Result<ScrapedPage, WebError> {
        let request = ScrapeRequest {
            url: url.as_str(),
            formats: ["markdown", "html"],
        };

        let response: ScrapeResponse = self.post("/scrape", &request).await?;
        let mut page: ScrapedPage = response
            .data
            .map(scraped_page)
            .unwrap_or_default();

        if page.url.is_empty() {
            page.url = url.to_string();
        }

        Ok(page)
    }
}

fn crawled_pages(data: Vec<PageData>) -> Vec<CrawledPage> {
    data.into_iter()
        .map(scraped_page)
        .map(|page| CrawledPage {
            url: page.url,
            markdown: page.markdown,
        })
        .collect()
}
