//! Shared pipeline plumbing
//!
//! Every pipeline runs its steps in order and awaits each one. A seed that
//! fails is logged, recorded in the report and skipped; only configuration
//! and storage errors abort a run.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use outbound_agents::{ingest_records, SharedSink};
use outbound_core::{KeywordMatcher, PageRecord, Signal, Vertical};
use outbound_web::Fetcher;

/// Timeout for fetching a seed page
pub const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub pipeline: String,
    /// Pages fetched successfully
    pub pages: usize,
    /// Signals persisted after deduplication
    pub signals: usize,
    /// Extracted records (companies, people, contacts) persisted
    pub records: usize,
    /// Records sent to the enrichment webhook
    pub ingested: usize,
    /// Seeds or domains that failed, with the reason
    pub skipped: Vec<String>,
}

impl RunReport {
    pub fn new(pipeline: &str) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            ..Default::default()
        }
    }

    pub fn skip(&mut self, what: &str, reason: impl std::fmt::Display) {
        warn!("Skipping {}: {}", what, reason);
        self.skipped.push(format!("{}: {}", what, reason));
    }
}

/// A runnable pipeline
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> anyhow::Result<RunReport>;
}

/// A fetched seed page with its keyword signals
#[derive(Debug, Clone)]
pub struct HarvestedPage {
    pub url: Url,
    pub body: String,
    pub record: PageRecord,
    pub signals: Vec<Signal>,
}

/// Fetch each seed and match it against the vertical's keyword table.
///
/// Unparseable or unreachable seeds are skipped and noted in `report`.
pub async fn harvest(
    fetcher: &dyn Fetcher,
    seeds: &[String],
    vertical: Vertical,
    report: &mut RunReport,
) -> Vec<HarvestedPage> {
    let matcher = KeywordMatcher::for_vertical(vertical);
    let mut pages = Vec::new();

    for seed in seeds {
        let url = match Url::parse(seed) {
            Ok(url) => url,
            Err(e) => {
                report.skip(seed, e);
                continue;
            }
        };

        let fetched = match fetcher.get(&url, PAGE_FETCH_TIMEOUT).await {
            Ok(page) => page,
            Err(e) => {
                report.skip(seed, e);
                continue;
            }
        };

        let signals = matcher.extract(&fetched.body, url.as_str(), "html");
        info!("{}: {} bytes, {} signal(s)", url, fetched.body.len(), signals.len());

        pages.push(HarvestedPage {
            record: PageRecord::new(url.as_str(), &page_source(&url), fetched.body.len()),
            url,
            body: fetched.body,
            signals,
        });
    }

    report.pages += pages.len();
    pages
}

/// Short label for where a page lives: `research.google` -> `research`
pub fn page_source(url: &Url) -> String {
    url.host_str()
        .map(|host| {
            host.split('.')
                .find(|label| *label != "www")
                .unwrap_or(host)
                .to_string()
        })
        .unwrap_or_default()
}

/// Drop repeated signals, keeping first occurrences in order
pub fn dedupe_signals(signals: Vec<Signal>) -> Vec<Signal> {
    let mut seen = HashSet::new();
    signals
        .into_iter()
        .filter(|signal| seen.insert(signal.origin_hash()))
        .collect()
}

/// Where a pipeline's records go after storage
#[derive(Clone, Default)]
pub enum Delivery {
    /// Push to the webhook
    Webhook(SharedSink),
    /// No webhook configured: fail on first use
    Unconfigured(String),
    /// Deliberately skip the webhook
    #[default]
    Disabled,
}

impl Delivery {
    /// Push `records`, if any. An unconfigured webhook is an error only
    /// when there is something to send.
    pub async fn send<T: Serialize + Sync>(&self, records: &[T]) -> anyhow::Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        match self {
            Delivery::Webhook(sink) => Ok(ingest_records(sink.as_ref(), records).await?),
            Delivery::Unconfigured(reason) => anyhow::bail!("{}", reason),
            Delivery::Disabled => Ok(0),
        }
    }
}
