//! Document sinks for canonical event records.
//!
//! The normalizer hands each accepted record to an [`EventStore`] and never
//! reads it back; the read endpoint asks the same store for the newest
//! records. Inserts are at-least-once, no uniqueness is enforced.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::record::EventRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document store request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, record: EventRecord) -> Result<(), StoreError>;

    /// Newest records first, at most `limit` of them.
    async fn latest(&self, limit: usize) -> Result<Vec<EventRecord>, StoreError>;
}

/// In-process sink keeping the most recent records in a bounded ring.
/// The default when no external document store is configured, and the test
/// double everywhere else.
pub struct MemoryStore {
    capacity: usize,
    records: RwLock<VecDeque<EventRecord>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: RwLock::new(VecDeque::new()),
        }
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert(&self, record: EventRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
        Ok(())
    }

    async fn latest(&self, limit: usize) -> Result<Vec<EventRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}

/// Sink backed by an external document store speaking JSON over HTTP.
/// Each record is posted as one document to `{base_url}/events`; reads go
/// through the same resource with a `limit` query.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.base_url)
    }
}

#[async_trait]
impl EventStore for HttpStore {
    async fn insert(&self, record: EventRecord) -> Result<(), StoreError> {
        debug!(kind = %record.kind, "posting event document to {}", self.base_url);
        self.client
            .post(self.events_url())
            .json(&record)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn latest(&self, limit: usize) -> Result<Vec<EventRecord>, StoreError> {
        let records = self
            .client
            .get(self.events_url())
            .query(&[("limit", limit)])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<EventRecord>>()
            .await?;
        Ok(records)
    }
}
