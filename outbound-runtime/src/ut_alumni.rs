//! UT-Alumni donor discovery
//!
//! Giving and alumni pages are scanned for donor rolls, endowments,
//! sponsorships and board affiliations. With an extractor configured,
//! alumni named on those pages are also saved as contacts.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use outbound_agents::{upsert_records, LlmExtractor, SharedStore};
use outbound_core::{html_to_text, AlumniRecord, ContactRecord, DonorSignal, PageRecord, Vertical};
use outbound_web::SharedFetcher;

use crate::{dedupe_signals, harvest, Delivery, Pipeline, RunReport};

/// Seed pages used when none are given
pub const DEFAULT_UT_SEEDS: &[&str] = &[
    "https://giving.utexas.edu/",
    "https://www.texasexes.org/",
    "https://www.cs.utexas.edu/alumni",
];

#[derive(Debug, Clone)]
pub struct UtAlumniConfig {
    pub seeds: Vec<String>,
    pub pages_table: String,
    pub signals_table: String,
    pub contacts_table: String,
}

impl Default for UtAlumniConfig {
    fn default() -> Self {
        Self {
            seeds: DEFAULT_UT_SEEDS.iter().map(|s| s.to_string()).collect(),
            pages_table: "ut_pages".to_string(),
            signals_table: "ut_donor_signals".to_string(),
            contacts_table: "contacts".to_string(),
        }
    }
}

/// An alumnus as an outreach contact
fn alumni_contact(alumnus: AlumniRecord) -> ContactRecord {
    let title = match alumnus.role {
        Some(role) if !role.trim().is_empty() => role,
        _ => alumnus.ut_affiliation,
    };

    ContactRecord {
        name: alumnus.name,
        title,
        email: None,
        organization: alumnus.organization,
    }
}

pub struct UtAlumniPipeline {
    fetcher: SharedFetcher,
    store: SharedStore,
    delivery: Delivery,
    extractor: Option<Arc<LlmExtractor>>,
    config: UtAlumniConfig,
}

impl UtAlumniPipeline {
    pub fn new(fetcher: SharedFetcher, store: SharedStore, delivery: Delivery, config: UtAlumniConfig) -> Self {
        Self {
            fetcher,
            store,
            delivery,
            extractor: None,
            config,
        }
    }

    /// Also extract alumni contacts with the LLM
    pub fn with_extractor(mut self, extractor: Arc<LlmExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }
}

#[async_trait]
impl Pipeline for UtAlumniPipeline {
    fn name(&self) -> &str {
        "ut-alumni"
    }

    async fn run(&self) -> anyhow::Result<RunReport> {
        let mut report = RunReport::new(self.name());
        info!("UT-Alumni: {} seed page(s)", self.config.seeds.len());

        let pages = harvest(self.fetcher.as_ref(), &self.config.seeds, Vertical::UtAlumni, &mut report).await;

        let records: Vec<PageRecord> = pages.iter().map(|p| p.record.clone()).collect();
        upsert_records(self.store.as_ref(), &self.config.pages_table, &records).await?;

        if let Some(extractor) = &self.extractor {
            let texts: Vec<String> = pages
                .iter()
                .map(|p| html_to_text(&p.body))
                .filter(|t| !t.is_empty())
                .collect();

            match extractor.extract_alumni(&texts).await {
                Ok(alumni) => {
                    let contacts: Vec<ContactRecord> = alumni.into_iter().map(alumni_contact).collect();
                    report.records +=
                        upsert_records(self.store.as_ref(), &self.config.contacts_table, &contacts).await?;
                }
                Err(e) => report.skip("alumni extraction", e),
            }
        }

        let signals = dedupe_signals(pages.into_iter().flat_map(|p| p.signals).collect());
        let donor_signals: Vec<DonorSignal> = signals.into_iter().map(DonorSignal::from).collect();

        report.signals = upsert_records(self.store.as_ref(), &self.config.signals_table, &donor_signals).await?;
        report.ingested = self.delivery.send(&donor_signals).await?;

        info!(
            "UT-Alumni complete: {} page(s), {} donor signal(s), {} contact(s)",
            report.pages, report.signals, report.records
        );
        Ok(report)
    }
}
