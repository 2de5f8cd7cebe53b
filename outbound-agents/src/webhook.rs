//! Enrichment webhook ingestion (Clay)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{ClayConfig, StoreError};

/// A sink accepting batches of JSON records
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Push one batch; returns the webhook's JSON reply (`{}` when empty)
    async fn ingest(&self, records: &[Value]) -> Result<Value, StoreError>;
}

/// Thread-safe reference to a record sink
pub type SharedSink = Arc<dyn RecordSink>;

/// Serialize typed records and push them. Empty input sends nothing.
pub async fn ingest_records<T: Serialize>(sink: &dyn RecordSink, records: &[T]) -> Result<usize, StoreError> {
    if records.is_empty() {
        return Ok(0);
    }

    let values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    sink.ingest(&values).await?;
    Ok(values.len())
}

/// Clay webhook client
pub struct ClayClient {
    client: reqwest::Client,
    config: ClayConfig,
}

impl ClayClient {
    pub fn new(config: ClayConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::ClientBuild(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn body(&self, records: &[Value]) -> Value {
        if self.config.envelope {
            json!({ "records": records })
        } else {
            Value::Array(records.to_vec())
        }
    }
}

#[async_trait]
impl RecordSink for ClayClient {
    async fn ingest(&self, records: &[Value]) -> Result<Value, StoreError> {
        let mut request = self.client.post(&self.config.webhook_url).json(&self.body(records));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Api {
                target: "Clay webhook".to_string(),
                status: status.as_u16(),
                body: outbound_core::truncate_chars(&text, 200),
            });
        }

        info!("Sent {} record(s) to Clay", records.len());

        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        // Clay sometimes answers with plain text
        Ok(serde_json::from_str(&text).unwrap_or_else(|_| json!({ "response": text })))
    }
}

/// Collects batches in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<Value>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<Value>> {
        self.batches.lock().clone()
    }

    /// All records across batches
    pub fn records(&self) -> Vec<Value> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn ingest(&self, records: &[Value]) -> Result<Value, StoreError> {
        self.batches.lock().push(records.to_vec());
        Ok(json!({}))
    }
}
