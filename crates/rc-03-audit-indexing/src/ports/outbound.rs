//! # Outbound Ports
//!
//! Persistence required by the indexer.

use crate::domain::{AuditRecord, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Append-only audit storage.
///
/// Query results are ordered by `(timestamp, sequence)` and both range bounds
/// are inclusive.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Insert a record unless its key is already present.
    ///
    /// Returns `true` when the row is new.
    async fn upsert(&self, record: AuditRecord) -> Result<bool, StoreError>;

    async fn by_entity(
        &self,
        entity_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, StoreError>;

    async fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, StoreError>;
}
