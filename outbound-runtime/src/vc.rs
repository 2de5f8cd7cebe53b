//! VC-Partnerships discovery
//!
//! Portfolio listings are fetched (following pagination), companies are
//! extracted and narrowed to Series A and later, and each company's
//! partner and community pages are scanned for partnership programs.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use outbound_agents::{upsert_records, LlmExtractor, SharedStore};
use outbound_core::{
    html_to_text, ContactRecord, KeywordMatcher, PageRecord, PartnershipSignal, PersonRecord, PortfolioCompany, Signal,
    Vertical,
};
use outbound_web::{discover_pagination_urls, SharedFetcher, WebError};

use crate::{dedupe_signals, Delivery, Pipeline, RunReport, PAGE_FETCH_TIMEOUT};

/// Portfolio listings used when none are given
pub const DEFAULT_VC_PORTFOLIO_URLS: &[&str] = &[
    "https://a16z.com/portfolio/",
    "https://www.sequoiacap.com/our-companies/",
    "https://www.accel.com/relationships",
];

/// Company pages scanned for partnership programs
pub const PARTNER_PATHS: &[&str] = &["/partners", "/community"];

#[derive(Debug, Clone)]
pub struct VcConfig {
    pub portfolio_urls: Vec<String>,
    pub portfolios_table: String,
    pub companies_table: String,
    pub signals_table: String,
    pub contacts_table: String,
    /// Listing pages followed per portfolio, seed included
    pub max_pages: usize,
}

impl Default for VcConfig {
    fn default() -> Self {
        Self {
            portfolio_urls: DEFAULT_VC_PORTFOLIO_URLS.iter().map(|s| s.to_string()).collect(),
            portfolios_table: "vc_portfolios".to_string(),
            companies_table: "portfolio_companies".to_string(),
            signals_table: "partnership_signals".to_string(),
            contacts_table: "contacts".to_string(),
            max_pages: 8,
        }
    }
}

/// Partnership evidence gathered for one company
#[derive(Debug, Default)]
struct CompanyScan {
    signals: Vec<Signal>,
    texts: Vec<String>,
}

pub struct VcPipeline {
    fetcher: SharedFetcher,
    store: SharedStore,
    delivery: Delivery,
    extractor: Option<Arc<LlmExtractor>>,
    config: VcConfig,
}

impl VcPipeline {
    pub fn new(fetcher: SharedFetcher, store: SharedStore, delivery: Delivery, config: VcConfig) -> Self {
        Self {
            fetcher,
            store,
            delivery,
            extractor: None,
            config,
        }
    }

    /// Extract portfolio companies and company contacts with the LLM
    pub fn with_extractor(mut self, extractor: Arc<LlmExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Fetch a listing and its follow-up pages; returns the seed record and page texts
    async fn fetch_listing(&self, url: &Url) -> Result<(PageRecord, Vec<String>), WebError> {
        let first = self.fetcher.get(url, PAGE_FETCH_TIMEOUT).await?;
        let record = PageRecord::new(url.as_str(), "portfolio", first.body.len());

        let mut texts = vec![html_to_text(&first.body)];
        for next in discover_pagination_urls(&first.body, url, self.config.max_pages)
            .iter()
            .skip(1)
        {
            match self.fetcher.get(next, PAGE_FETCH_TIMEOUT).await {
                Ok(page) => texts.push(html_to_text(&page.body)),
                Err(e) => debug!("Skipping listing page {}: {}", next, e),
            }
        }

        texts.retain(|t| !t.is_empty());
        Ok((record, texts))
    }

    /// Scan a company's partner pages; missing pages are not errors
    async fn scan_company(&self, domain: &str) -> CompanyScan {
        let matcher = KeywordMatcher::for_vertical(Vertical::VcPartnerships);
        let mut scan = CompanyScan::default();

        for path in PARTNER_PATHS {
            let Ok(url) = Url::parse(&format!("https://{}{}", domain, path)) else {
                continue;
            };

            match self.fetcher.get(&url, PAGE_FETCH_TIMEOUT).await {
                Ok(page) => {
                    scan.signals.extend(matcher.extract(&page.body, url.as_str(), "html"));
                    scan.texts.push(html_to_text(&page.body));
                }
                Err(e) => debug!("No partner page at {}: {}", url, e),
            }
        }

        scan
    }
}

fn company_contact(person: PersonRecord, company: &PortfolioCompany) -> ContactRecord {
    ContactRecord {
        name: person.name,
        title: person.title.unwrap_or_default(),
        email: None,
        organization: Some(company.name.clone()),
    }
}

#[async_trait]
impl Pipeline for VcPipeline {
    fn name(&self) -> &str {
        "vc"
    }

    async fn run(&self) -> anyhow::Result<RunReport> {
        let mut report = RunReport::new(self.name());
        let mut portfolios = Vec::new();
        let mut companies: Vec<PortfolioCompany> = Vec::new();

        if self.extractor.is_none() {
            info!("No extractor configured: portfolio companies will not be extracted");
        }

        for seed in &self.config.portfolio_urls {
            let url = match Url::parse(seed) {
                Ok(url) => url,
                Err(e) => {
                    report.skip(seed, e);
                    continue;
                }
            };

            let (record, texts) = match self.fetch_listing(&url).await {
                Ok(listing) => listing,
                Err(e) => {
                    report.skip(seed, e);
                    continue;
                }
            };
            report.pages += texts.len();
            portfolios.push(record);

            if let Some(extractor) = &self.extractor {
                match extractor.extract_portfolio_companies(&texts).await {
                    Ok(found) => {
                        info!("{}: {} portfolio companies", url, found.len());
                        companies.extend(found);
                    }
                    Err(e) => report.skip(seed, e),
                }
            }
        }

        upsert_records(self.store.as_ref(), &self.config.portfolios_table, &portfolios).await?;

        let filtered: Vec<PortfolioCompany> = companies.into_iter().filter(|c| c.is_series_a_plus()).collect();
        report.records += upsert_records(self.store.as_ref(), &self.config.companies_table, &filtered).await?;

        let mut signals = Vec::new();
        let mut contacts = Vec::new();

        for company in &filtered {
            let Some(domain) = company.domain.as_deref() else {
                continue;
            };

            let scan = self.scan_company(domain).await;
            let company_signals: Vec<PartnershipSignal> = dedupe_signals(scan.signals)
                .into_iter()
                .map(|s| PartnershipSignal::from_signal(s, domain))
                .collect();
            debug!("{}: {} partnership signal(s)", domain, company_signals.len());
            signals.extend(company_signals);

            let Some(extractor) = &self.extractor else {
                continue;
            };
            if scan.texts.is_empty() {
                continue;
            }

            let stage = company.funding_stage.as_deref().unwrap_or_default();
            match extractor.extract_company_people(&scan.texts, stage, None).await {
                Ok(people) => contacts.extend(people.into_iter().map(|p| company_contact(p, company))),
                Err(e) => report.skip(domain, e),
            }
        }

        report.records += upsert_records(self.store.as_ref(), &self.config.contacts_table, &contacts).await?;
        report.signals = upsert_records(self.store.as_ref(), &self.config.signals_table, &signals).await?;
        report.ingested = self.delivery.send(&signals).await?;

        info!(
            "VC complete: {} portfolio page(s), {} Series A+ companies, {} signal(s)",
            report.pages,
            filtered.len(),
            report.signals
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbound_agents::testing::ScriptedBackend;
    use outbound_agents::{MemorySink, MemoryStore};
    use outbound_core::RateLimiter;
    use outbound_web::testing::StaticFetcher;

    const PORTFOLIO: &str = r#"
        <html><body>
            <ul><li>Acme Robotics</li><li>Beta Labs</li></ul>
            <div class="pagination"><a href="/portfolio?page=2">2</a></div>
        </body></html>
    "#;

    const PORTFOLIO_PAGE_2: &str = "<html><body><ul><li>Gamma AI</li></ul></body></html>";

    const ACME_PARTNERS: &str = r#"
        <html><body>
            <h1>Partners</h1>
            <p>Our University Programs team works with labs worldwide.</p>
            <p>Dana Lee, Head of Partnerships</p>
        </body></html>
    "#;

    fn fetcher() -> Arc<StaticFetcher> {
        Arc::new(
            StaticFetcher::new()
                .with_page("https://fund.example/portfolio", PORTFOLIO)
                .with_page("https://fund.example/portfolio?page=2", PORTFOLIO_PAGE_2)
                .with_page("https://acme.io/partners", ACME_PARTNERS),
        )
    }

    fn config() -> VcConfig {
        VcConfig {
            portfolio_urls: vec!["https://fund.example/portfolio".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_vc_pipeline() {
        let fetcher = fetcher();
        let store = MemoryStore::shared();
        let sink = Arc::new(MemorySink::new());
        let backend = ScriptedBackend::new(&[
            r#"[
                {"name": "Acme Robotics", "domain": "acme.io", "funding_stage": "Series B"},
                {"name": "Beta Labs", "domain": "beta.dev", "funding_stage": "Seed"},
                {"name": "Gamma AI", "funding_stage": "Series A"}
            ]"#,
            r#"[{"name": "Dana Lee", "title": "Head of Partnerships"}]"#,
        ]);
        let extractor = Arc::new(LlmExtractor::new(backend.clone(), Arc::new(RateLimiter::default())));

        let pipeline = VcPipeline::new(fetcher.clone(), store.clone(), Delivery::Webhook(sink.clone()), config())
            .with_extractor(extractor);
        let report = pipeline.run().await.unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(store.rows("vc_portfolios").len(), 1);

        let companies = store.rows("portfolio_companies");
        let names: Vec<_> = companies.iter().map(|c| c["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Acme Robotics", "Gamma AI"]);

        // Only Acme has a domain; its /community page is missing
        let signals = store.rows("partnership_signals");
        let types: Vec<_> = signals.iter().map(|s| s["signal_type"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["Partners", "University Programs"]);
        assert!(signals.iter().all(|s| s["company_domain"] == "acme.io"));
        assert_eq!(sink.records().len(), 2);

        let contacts = store.rows("contacts");
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0]["organization"], "Acme Robotics");

        let prompts = backend.prompts();
        assert!(prompts[0].contains("Gamma AI"));
        assert!(prompts[1].contains("all employees (leadership prioritized)"));
        assert!(fetcher.get_calls().contains(&"https://acme.io/community".to_string()));
    }

    #[tokio::test]
    async fn test_vc_pipeline_without_extractor() {
        let store = MemoryStore::shared();
        let pipeline = VcPipeline::new(fetcher(), store.clone(), Delivery::Disabled, config());

        let report = pipeline.run().await.unwrap();

        assert_eq!(store.rows("vc_portfolios").len(), 1);
        assert!(store.rows("portfolio_companies").is_empty());
        assert_eq!(report.signals, 0);
    }
}
