//! Record storage
//!
//! Rows are upserted into named tables. The production store is Supabase's
//! PostgREST API; [`MemoryStore`] keeps rows in process for tests and dry runs.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::SupabaseConfig;

/// Storage and webhook errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Client build failed: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{target} returned {status}: {body}")]
    Api {
        target: String,
        status: u16,
        body: String,
    },

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A table-oriented upsert sink
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or merge `rows` into `table`. Empty input is a no-op.
    async fn upsert(&self, table: &str, rows: &[Value]) -> Result<(), StoreError>;
}

/// Thread-safe reference to a record store
pub type SharedStore = Arc<dyn RecordStore>;

/// Serialize typed records and upsert them, returning the row count
pub async fn upsert_records<T: Serialize>(
    store: &dyn RecordStore,
    table: &str,
    records: &[T],
) -> Result<usize, StoreError> {
    if records.is_empty() {
        return Ok(0);
    }

    let rows = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    store.upsert(table, &rows).await?;
    Ok(rows.len())
}

/// Sorted union of the object keys in `rows`, comma-joined.
///
/// PostgREST rejects a bulk insert whose objects disagree on keys unless
/// the columns are named; missing keys then take the column default.
pub fn column_list(rows: &[Value]) -> String {
    let columns: BTreeSet<&str> = rows
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    columns.into_iter().collect::<Vec<_>>().join(",")
}

/// Supabase PostgREST store
pub struct SupabaseStore {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::ClientBuild(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), table)
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn upsert(&self, table: &str, rows: &[Value]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let url = self.table_url(table);
        let columns = column_list(rows);
        debug!("Upserting {} row(s) into {} ({})", rows.len(), table, columns);

        let mut request = self.client.post(&url);
        if !columns.is_empty() {
            request = request.query(&[("columns", columns.as_str())]);
        }

        let response = request
            .header("apikey", &self.config.key)
            .bearer_auth(&self.config.key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                target: format!("Supabase table {}", table),
                status,
                body,
            });
        }

        info!("Upserted {} row(s) into {}", rows.len(), table);
        Ok(())
    }
}

/// In-process store. Identical rows are stored once per table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Rows stored in `table`, in insertion order
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    /// Names of tables that received at least one row
    pub fn tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert(&self, table: &str, rows: &[Value]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tables = self.tables.lock();
        let stored = tables.entry(table.to_string()).or_default();
        for row in rows {
            if !stored.contains(row) {
                stored.push(row.clone());
            }
        }
        Ok(())
    }
}
