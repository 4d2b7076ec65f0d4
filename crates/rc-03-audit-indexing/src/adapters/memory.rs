//! In-memory [`AuditStore`] for tests and single-process deployments.

use crate::domain::{AuditKey, AuditRecord, StoreError};
use crate::ports::AuditStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Default)]
struct Rows {
    records: Vec<AuditRecord>,
    keys: HashSet<AuditKey>,
}

/// Audit store backed by a vector and a key set.
#[derive(Default)]
pub struct InMemoryAuditStore {
    rows: RwLock<Rows>,
}

impl InMemoryAuditStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every record, ordered by `(timestamp, sequence)`.
    #[must_use]
    pub fn all(&self) -> Vec<AuditRecord> {
        self.select(|_| true)
    }

    fn select<F>(&self, keep: F) -> Vec<AuditRecord>
    where
        F: Fn(&AuditRecord) -> bool,
    {
        let mut out: Vec<AuditRecord> = self
            .rows
            .read()
            .records
            .iter()
            .filter(|r| keep(r))
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.timestamp, r.sequence));
        out
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn upsert(&self, record: AuditRecord) -> Result<bool, StoreError> {
        let mut rows = self.rows.write();
        if !rows.keys.insert(record.key()) {
            return Ok(false);
        }
        rows.records.push(record);
        Ok(true)
    }

    async fn by_entity(
        &self,
        entity_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self.select(|r| r.entity_id == entity_id && r.timestamp >= from && r.timestamp <= to))
    }

    async fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self.select(|r| r.timestamp >= from && r.timestamp <= to))
    }
}
