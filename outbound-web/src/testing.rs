//! In-memory fetchers for tests and offline runs.
//!
//! [`StaticFetcher`] answers HEAD probes and page fetches from fixed maps and
//! records every URL it was asked for. It also scrapes and crawls from the
//! same pages.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use outbound_core::html_to_text;

use crate::{CrawledPage, FetchedPage, Fetcher, PageScraper, ProbeOutcome, ScrapedPage, SiteCrawler, WebError};

/// Fetcher backed by fixed responses.
///
/// Unknown URLs probe as `Miss(404)` and fetch as a 404 error.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    heads: HashMap<String, ProbeOutcome>,
    pages: HashMap<String, String>,
    head_calls: Mutex<Vec<String>>,
    get_calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer HEAD for `url` with a hit on the same URL
    pub fn with_live(mut self, url: &str) -> Self {
        if let Ok(parsed) = Url::parse(url) {
            self.heads.insert(parsed.to_string(), ProbeOutcome::Hit(parsed));
        }
        self
    }

    /// Answer HEAD for `url` with a specific outcome
    pub fn with_head(mut self, url: &str, outcome: ProbeOutcome) -> Self {
        if let Ok(parsed) = Url::parse(url) {
            self.heads.insert(parsed.to_string(), outcome);
        }
        self
    }

    /// Serve `body` for GET `url`; the URL also probes as live
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        if let Ok(parsed) = Url::parse(url) {
            self.pages.insert(parsed.to_string(), body.to_string());
            self.heads
                .entry(parsed.to_string())
                .or_insert(ProbeOutcome::Hit(parsed));
        }
        self
    }

    /// URLs probed with HEAD, in call order
    pub fn head_calls(&self) -> Vec<String> {
        self.head_calls.lock().clone()
    }

    /// URLs fetched with GET, in call order
    pub fn get_calls(&self) -> Vec<String> {
        self.get_calls.lock().clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn head(&self, url: &Url, _timeout: Duration) -> ProbeOutcome {
        self.head_calls.lock().push(url.to_string());
        self.heads
            .get(url.as_str())
            .cloned()
            .unwrap_or(ProbeOutcome::Miss(404))
    }

    async fn get(&self, url: &Url, _timeout: Duration) -> Result<FetchedPage, WebError> {
        self.get_calls.lock().push(url.to_string());
        match self.pages.get(url.as_str()) {
            Some(body) => Ok(FetchedPage {
                status: 200,
                final_url: url.clone(),
                body: body.clone(),
            }),
            None => Err(WebError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[async_trait]
impl PageScraper for StaticFetcher {
    async fn scrape(&self, url: &Url) -> Result<ScrapedPage, WebError> {
        let page = self.get(url, Duration::from_secs(5)).await?;
        Ok(ScrapedPage {
            url: url.to_string(),
            markdown: String::new(),
            html: page.body,
        })
    }
}

#[async_trait]
impl SiteCrawler for StaticFetcher {
    /// Every served page under `url`, sorted by URL; include paths are ignored
    async fn crawl(&self, url: &str, limit: u32, _include_paths: &[&str]) -> Result<Vec<CrawledPage>, WebError> {
        let prefix = Url::parse(url)
            .map_err(|e| WebError::InvalidUrl(e.to_string()))?
            .to_string();

        let mut urls: Vec<&String> = self.pages.keys().filter(|u| u.starts_with(&prefix)).collect();
        urls.sort();

        Ok(urls
            .into_iter()
            .take(limit as usize)
            .map(|u| CrawledPage {
                url: u.clone(),
                markdown: html_to_text(&self.pages[u]),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_urls_miss() {
        let fetcher = StaticFetcher::new().with_live("https://a.example/team");
        let unknown = Url::parse("https://a.example/nope").unwrap();

        assert!(matches!(fetcher.head(&unknown, Duration::from_secs(1)).await, ProbeOutcome::Miss(404)));
        assert!(fetcher.get(&unknown, Duration::from_secs(1)).await.is_err());
        assert_eq!(fetcher.head_calls(), vec!["https://a.example/nope"]);
    }

    #[tokio::test]
    async fn test_crawl_serves_pages_under_prefix() {
        let fetcher = StaticFetcher::new()
            .with_page("https://a.example/team", "<p>Jane Doe</p>")
            .with_page("https://a.example/about", "<p>About</p>")
            .with_page("https://b.example/team", "<p>Other</p>");

        let pages = fetcher.crawl("https://a.example", 10, &[]).await.unwrap();
        let urls: Vec<_> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example/about", "https://a.example/team"]);
        assert_eq!(pages[1].markdown, "Jane Doe");

        assert_eq!(fetcher.crawl("https://a.example", 1, &[]).await.unwrap().len(), 1);
    }
}
