//! Single-site people finder
//!
//! Crawls team-like pages of one site, asks the LLM for the names and
//! roles on each page and optionally forwards the deduplicated list to a
//! webhook.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use outbound_agents::{clean_content_for_llm, LlmExtractor};
use outbound_core::NamedPerson;
use outbound_web::{SharedCrawler, TEAM_INCLUDE_PATHS};

use crate::{Delivery, Pipeline, RunReport};

/// Pages with less content than this are not analyzed
pub const MIN_PAGE_CHARS: usize = 50;

/// Pause between analyzed pages
pub const PAGE_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct PeopleConfig {
    pub url: String,
    pub max_pages: u32,
    /// Kind of people to focus on, e.g. "founders, engineering leads"
    pub signals: Option<String>,
    pub include_paths: Vec<String>,
}

impl PeopleConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_pages: 20,
            signals: None,
            include_paths: TEAM_INCLUDE_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Keep the first entry for each name
pub fn dedupe_by_name(people: Vec<NamedPerson>) -> Vec<NamedPerson> {
    let mut seen = HashSet::new();
    people
        .into_iter()
        .filter(|p| seen.insert(p.name.clone()))
        .collect()
}

pub struct PeopleFinder {
    crawler: SharedCrawler,
    extractor: Arc<LlmExtractor>,
    delivery: Delivery,
    config: PeopleConfig,
}

impl PeopleFinder {
    pub fn new(crawler: SharedCrawler, extractor: Arc<LlmExtractor>, delivery: Delivery, config: PeopleConfig) -> Self {
        Self {
            crawler,
            extractor,
            delivery,
            config,
        }
    }

    /// Crawl and extract, returning deduplicated people
    pub async fn find(&self, report: &mut RunReport) -> anyhow::Result<Vec<NamedPerson>> {
        let include: Vec<&str> = self.config.include_paths.iter().map(String::as_str).collect();
        let pages = self
            .crawler
            .crawl(&self.config.url, self.config.max_pages, &include)
            .await?;
        info!("Crawled {} page(s) from {}", pages.len(), self.config.url);

        let signals = self.config.signals.as_deref();
        let mut people = Vec::new();

        for page in &pages {
            if page.markdown.chars().count() < MIN_PAGE_CHARS {
                continue;
            }

            let content = clean_content_for_llm(&page.markdown);
            if content.chars().count() < MIN_PAGE_CHARS {
                debug!("Skipping {}: no meaningful content", page.url);
                continue;
            }
            report.pages += 1;

            match self.extractor.extract_names(&content, &page.url, signals).await {
                Ok(found) => {
                    info!("{}: {} name(s)", page.url, found.len());
                    people.extend(found);
                }
                Err(e) => report.skip(&page.url, e),
            }

            tokio::time::sleep(PAGE_PAUSE).await;
        }

        Ok(dedupe_by_name(people))
    }

    /// Forward found people to the configured webhook
    pub async fn deliver(&self, people: &[NamedPerson], report: &mut RunReport) -> anyhow::Result<()> {
        report.records = people.len();
        report.ingested = self.delivery.send(people).await?;
        Ok(())
    }

    /// Find people and forward them; returns the report and the people
    pub async fn run_with_people(&self) -> anyhow::Result<(RunReport, Vec<NamedPerson>)> {
        let mut report = RunReport::new("people");

        let people = self.find(&mut report).await?;
        self.deliver(&people, &mut report).await?;

        info!("Found {} unique people", people.len());
        Ok((report, people))
    }
}

#[async_trait]
impl Pipeline for PeopleFinder {
    fn name(&self) -> &str {
        "people"
    }

    async fn run(&self) -> anyhow::Result<RunReport> {
        Ok(self.run_with_people().await?.0)
    }
}
