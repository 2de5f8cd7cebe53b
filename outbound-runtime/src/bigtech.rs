//! BigTech signal discovery
//!
//! Seed pages at large tech companies (research, careers, engineering
//! blogs) are fetched and scanned for university relations, developer
//! relations and similar programs.

use async_trait::async_trait;
use tracing::info;

use outbound_agents::{upsert_records, SharedStore};
use outbound_core::{PageRecord, Vertical};
use outbound_web::SharedFetcher;

use crate::{dedupe_signals, harvest, Delivery, Pipeline, RunReport};

/// Seed pages used when none are given
pub const DEFAULT_BIGTECH_SEEDS: &[&str] = &[
    "https://research.google/",
    "https://careers.microsoft.com/",
    "https://engineering.fb.com/",
];

/// BigTech pipeline configuration
#[derive(Debug, Clone)]
pub struct BigTechConfig {
    pub seeds: Vec<String>,
    pub pages_table: String,
    pub signals_table: String,
}

impl Default for BigTechConfig {
    fn default() -> Self {
        Self {
            seeds: DEFAULT_BIGTECH_SEEDS.iter().map(|s| s.to_string()).collect(),
            pages_table: "bigtech_pages".to_string(),
            signals_table: "bigtech_signals".to_string(),
        }
    }
}

pub struct BigTechPipeline {
    fetcher: SharedFetcher,
    store: SharedStore,
    delivery: Delivery,
    config: BigTechConfig,
}

impl BigTechPipeline {
    pub fn new(fetcher: SharedFetcher, store: SharedStore, delivery: Delivery, config: BigTechConfig) -> Self {
        Self {
            fetcher,
            store,
            delivery,
            config,
        }
    }
}

#[async_trait]
impl Pipeline for BigTechPipeline {
    fn name(&self) -> &str {
        "bigtech"
    }

    async fn run(&self) -> anyhow::Result<RunReport> {
        let mut report = RunReport::new(self.name());
        info!("BigTech: {} seed page(s)", self.config.seeds.len());

        let pages = harvest(self.fetcher.as_ref(), &self.config.seeds, Vertical::BigTech, &mut report).await;

        let records: Vec<PageRecord> = pages.iter().map(|p| p.record.clone()).collect();
        upsert_records(self.store.as_ref(), &self.config.pages_table, &records).await?;

        let signals = dedupe_signals(pages.into_iter().flat_map(|p| p.signals).collect());
        report.signals = upsert_records(self.store.as_ref(), &self.config.signals_table, &signals).await?;
        report.ingested = self.delivery.send(&signals).await?;

        info!(
            "BigTech complete: {} page(s), {} signal(s), {} skipped",
            report.pages,
            report.signals,
            report.skipped.len()
        );
        Ok(report)
    }
}
