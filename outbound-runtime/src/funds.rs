//! VC fund pipeline
//!
//! For each fund domain: route to the team and portfolio pages, scrape each
//! with pagination, then make one LLM call per section to extract the
//! fund's people and portfolio companies.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use url::Url;

use outbound_agents::{upsert_records, LlmExtractor, SharedStore};
use outbound_core::{CompanyRecord, PersonRecord};
use outbound_web::{scrape_with_pagination, PageRouter, Route, SharedFetcher, SharedScraper};

use crate::{Pipeline, RunReport};

#[derive(Debug, Clone)]
pub struct FundConfig {
    pub domains: Vec<String>,
    /// Pages scraped per section, seed included
    pub max_pages: usize,
    pub people_table: String,
    pub companies_table: String,
}

impl Default for FundConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            max_pages: 8,
            people_table: "vc_people".to_string(),
            companies_table: "vc_portfolio_companies".to_string(),
        }
    }
}

/// Everything extracted across the funds of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FundResults {
    pub people: Vec<PersonRecord>,
    pub companies: Vec<CompanyRecord>,
}

pub struct FundPipeline {
    router: PageRouter,
    scraper: SharedScraper,
    extractor: Arc<LlmExtractor>,
    store: SharedStore,
    config: FundConfig,
}

impl FundPipeline {
    /// `fetcher` is used for routing probes, `scraper` for page content
    pub fn new(
        fetcher: SharedFetcher,
        scraper: SharedScraper,
        extractor: Arc<LlmExtractor>,
        store: SharedStore,
        config: FundConfig,
    ) -> Self {
        Self {
            router: PageRouter::new(fetcher),
            scraper,
            extractor,
            store,
            config,
        }
    }

    async fn scrape_section(&self, url: Option<&Url>) -> Vec<String> {
        match url {
            Some(url) => scrape_with_pagination(self.scraper.as_ref(), url, self.config.max_pages).await,
            None => Vec::new(),
        }
    }

    /// Route, scrape and extract every fund, skipping funds that fail
    pub async fn collect(&self, report: &mut RunReport) -> FundResults {
        let mut results = FundResults::default();

        for domain in &self.config.domains {
            let domain = domain.trim();
            if domain.is_empty() {
                continue;
            }

            info!("Routing pages for {}", domain);
            let Route {
                team_url,
                portfolio_url,
            } = self.router.route(domain).await;

            if team_url.is_none() && portfolio_url.is_none() {
                report.skip(domain, "no team or portfolio page found");
                continue;
            }

            let team_pages = self.scrape_section(team_url.as_ref()).await;
            let portfolio_pages = self.scrape_section(portfolio_url.as_ref()).await;
            report.pages += team_pages.len() + portfolio_pages.len();

            let extraction = match self
                .extractor
                .extract_vcs_and_companies(&team_pages, &portfolio_pages)
                .await
            {
                Ok(extraction) => extraction,
                Err(e) => {
                    report.skip(domain, e);
                    continue;
                }
            };

            info!(
                "{}: {} people, {} companies",
                domain,
                extraction.people.len(),
                extraction.companies.len()
            );

            results.people.extend(extraction.people.into_iter().map(|mut p| {
                p.source_domain = Some(domain.to_string());
                p
            }));
            results.companies.extend(extraction.companies.into_iter().map(|mut c| {
                c.source_domain = Some(domain.to_string());
                c
            }));
        }

        results
    }

    /// Upsert collected people and companies into their tables
    pub async fn store_results(&self, results: &FundResults, report: &mut RunReport) -> anyhow::Result<()> {
        report.records += upsert_records(self.store.as_ref(), &self.config.people_table, &results.people).await?;
        report.records += upsert_records(self.store.as_ref(), &self.config.companies_table, &results.companies).await?;
        Ok(())
    }

    /// Collect and persist; returns the report and the combined results
    pub async fn run_with_results(&self) -> anyhow::Result<(RunReport, FundResults)> {
        let mut report = RunReport::new("funds");
        let results = self.collect(&mut report).await;
        self.store_results(&results, &mut report).await?;

        info!(
            "Fund pipeline complete: {} people, {} companies from {} domain(s)",
            results.people.len(),
            results.companies.len(),
            self.config.domains.len()
        );
        Ok((report, results))
    }
}

#[async_trait]
impl Pipeline for FundPipeline {
    fn name(&self) -> &str {
        "funds"
    }

    async fn run(&self) -> anyhow::Result<RunReport> {
        Ok(self.run_with_results().await?.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbound_agents::testing::ScriptedBackend;
    use outbound_agents::{MemoryStore, RecordStore, StoreError};
    use outbound_core::RateLimiter;
    use outbound_web::testing::StaticFetcher;

    fn pipeline(fetcher: Arc<StaticFetcher>, backend: Arc<ScriptedBackend>, store: Arc<MemoryStore>) -> FundPipeline {
        let extractor = Arc::new(LlmExtractor::new(backend, Arc::new(RateLimiter::default())));
        FundPipeline::new(
            fetcher.clone(),
            fetcher,
            extractor,
            store,
            FundConfig {
                domains: vec!["fund.example".to_string(), "".to_string(), "empty.example".to_string()],
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_fund_pipeline() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_page(
                    "https://fund.example/team",
                    r#"<p>Jane Doe, General Partner</p><a rel="next" href="/team?page=2">Next</a>"#,
                )
                .with_page("https://fund.example/team?page=2", "<p>John Roe, Partner</p>")
                .with_page("https://fund.example/portfolio", "<p>Acme Robotics</p>"),
        );
        let backend = ScriptedBackend::new(&[
            r#"[{"name": "Jane Doe", "title": "General Partner"}, {"name": "John Roe", "title": "Partner"}]"#,
            r#"[{"company": "Acme Robotics", "domain": "acme.io"}]"#,
        ]);
        let store = MemoryStore::shared();

        let (report, results) = pipeline(fetcher, backend.clone(), store.clone())
            .run_with_results()
            .await
            .unwrap();

        assert_eq!(report.pages, 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(results.people.len(), 2);
        assert!(results
            .people
            .iter()
            .all(|p| p.source_domain.as_deref() == Some("fund.example")));
        assert_eq!(results.companies[0].source_domain.as_deref(), Some("fund.example"));

        assert_eq!(store.rows("vc_people").len(), 2);
        assert_eq!(store.rows("vc_portfolio_companies")[0]["company"], "Acme Robotics");

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Jane Doe, General Partner\nNext\n\n=== PAGE BREAK ===\n\nJohn Roe, Partner"));
    }

    struct RejectingStore;

    #[async_trait]
    impl RecordStore for RejectingStore {
        async fn upsert(&self, table: &str, _rows: &[serde_json::Value]) -> Result<(), StoreError> {
            Err(StoreError::Api {
                target: table.to_string(),
                status: 400,
                body: "rejected".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_results_survive_storage_failure() {
        let fetcher = Arc::new(StaticFetcher::new().with_page("https://fund.example/team", "<p>Jane Doe, Partner</p>"));
        let backend = ScriptedBackend::new(&[r#"[{"name": "Jane Doe", "title": "Partner"}]"#]);
        let extractor = Arc::new(LlmExtractor::new(backend, Arc::new(RateLimiter::default())));
        let pipeline = FundPipeline::new(
            fetcher.clone(),
            fetcher,
            extractor,
            Arc::new(RejectingStore),
            FundConfig {
                domains: vec!["fund.example".to_string()],
                ..Default::default()
            },
        );

        let mut report = RunReport::new("funds");
        let results = pipeline.collect(&mut report).await;
        assert_eq!(results.people.len(), 1);
        assert_eq!(results.people[0].source_domain.as_deref(), Some("fund.example"));

        assert!(pipeline.store_results(&results, &mut report).await.is_err());
        assert_eq!(report.records, 0);
    }

    #[tokio::test]
    async fn test_llm_failure_skips_domain() {
        let fetcher = Arc::new(StaticFetcher::new().with_page("https://fund.example/team", "<p>Jane Doe</p>"));
        let store = MemoryStore::shared();

        let report = pipeline(fetcher, ScriptedBackend::new(&[]), store.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.skipped.len(), 2);
        assert!(store.rows("vc_people").is_empty());
    }
}
