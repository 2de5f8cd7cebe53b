//! Page scraping with pagination
//!
//! A [`PageScraper`] returns markdown and/or HTML for one URL. Paginated
//! scraping reads the seed page, discovers follow-up pages from its HTML and
//! collects the text of every page that produced content.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use outbound_core::html_to_text;

use crate::{discover_pagination_urls, Fetcher, HttpFetcher, WebError};

/// Scraped content from one page
#[derive(Debug, Clone, Default)]
pub struct ScrapedPage {
    pub url: String,
    pub markdown: String,
    pub html: String,
}

impl ScrapedPage {
    /// Markdown when present, otherwise text extracted from the HTML
    pub fn content(&self) -> String {
        if !self.markdown.trim().is_empty() {
            self.markdown.clone()
        } else {
            html_to_text(&self.html)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markdown.trim().is_empty() && self.html.trim().is_empty()
    }
}

/// Anything that can render a page to markdown/HTML
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, url: &Url) -> Result<ScrapedPage, WebError>;
}

/// Thread-safe reference to a scraper
pub type SharedScraper = Arc<dyn PageScraper>;

#[async_trait]
impl PageScraper for HttpFetcher {
    async fn scrape(&self, url: &Url) -> Result<ScrapedPage, WebError> {
        let page = self.get(url, Duration::from_secs(30)).await?;
        Ok(ScrapedPage {
            url: page.final_url.to_string(),
            markdown: String::new(),
            html: page.body,
        })
    }
}

/// Scrape one page, treating failures as an empty page
pub async fn scrape_or_empty(scraper: &dyn PageScraper, url: &Url) -> ScrapedPage {
    match scraper.scrape(url).await {
        Ok(page) => page,
        Err(e) => {
            warn!("Failed to scrape {}: {}", url, e);
            ScrapedPage {
                url: url.to_string(),
                ..Default::default()
            }
        }
    }
}

/// Scrape `seed` and up to `max_pages - 1` follow-up pages.
///
/// Returns the text of each page that had content, seed first.
pub async fn scrape_with_pagination(
    scraper: &dyn PageScraper,
    seed: &Url,
    max_pages: usize,
) -> Vec<String> {
    let first = scrape_or_empty(scraper, seed).await;
    let page_urls = discover_pagination_urls(&first.html, seed, max_pages);

    let mut contents = Vec::new();
    if !first.is_empty() {
        contents.push(first.content());
    }

    for url in page_urls.iter().skip(1) {
        let page = scrape_or_empty(scraper, url).await;
        if page.is_empty() {
            debug!("No content from {}", url);
            continue;
        }
        contents.push(page.content());
    }

    debug!("Scraped {} page(s) starting at {}", contents.len(), seed);
    contents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticFetcher;

    #[test]
    fn test_content_prefers_markdown() {
        let page = ScrapedPage {
            url: "https://fund.example/team".to_string(),
            markdown: "# Team\nJane Doe".to_string(),
            html: "<p>ignored</p>".to_string(),
        };
        assert_eq!(page.content(), "# Team\nJane Doe");

        let html_only = ScrapedPage {
            markdown: "  ".to_string(),
            html: "<p>Jane Doe</p><p>Partner</p>".to_string(),
            ..page
        };
        assert_eq!(html_only.content(), "Jane Doe\nPartner");
    }

    #[tokio::test]
    async fn test_scrape_with_pagination_follows_next() {
        let fetcher = StaticFetcher::new()
            .with_page(
                "https://fund.example/team",
                r#"<p>Jane Doe</p><a rel="next" href="/team?page=2">Next</a>"#,
            )
            .with_page(
                "https://fund.example/team?page=2",
                r#"<p>John Roe</p><a rel="next" href="/team?page=3">Next</a>"#,
            );
        let seed = Url::parse("https://fund.example/team").unwrap();

        let contents = scrape_with_pagination(&fetcher, &seed, 8).await;

        assert_eq!(contents, vec!["Jane Doe\nNext".to_string(), "John Roe\nNext".to_string()]);
    }

    #[tokio::test]
    async fn test_scrape_with_pagination_missing_seed() {
        let fetcher = StaticFetcher::new();
        let seed = Url::parse("https://fund.example/team").unwrap();

        let contents = scrape_with_pagination(&fetcher, &seed, 8).await;
        assert!(contents.is_empty());
        assert_eq!(fetcher.get_calls().len(), 1);
    }
}
