//! # RC-03 Audit Indexing - Workflow Event Indexer
//!
//! **Subsystem ID:** 3
//!
//! ## Purpose
//!
//! Subscribes to the event bus and keeps an append-only, queryable audit
//! trail of every committed workflow transition.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | One row per envelope | `ports/outbound.rs` - `AuditStore::upsert()` |
//! | Redelivery never duplicates a row | `domain/record.rs` - `AuditKey` |
//! | Store failures never reach workflow callers | `service.rs` - `index()` |
//! | Abandoned envelopes are kept, not dropped | `service.rs` - dead-letter list |
//!
//! ## Failure Handling
//!
//! Writes run under a timeout and retry with exponential backoff. Once the
//! attempts are used up the envelope is dead-lettered under `dlq.audit`.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::adapters::InMemoryAuditStore;
    pub use crate::domain::{AuditRecord, StoreError};
    pub use crate::ports::AuditStore;
    pub use crate::service::{IndexerConfig, WorkflowEventIndexer};
}

pub use adapters::InMemoryAuditStore;
pub use domain::{describe, to_datetime, AuditKey, AuditRecord, StoreError};
pub use ports::AuditStore;
pub use service::{DeadLetter, IndexerConfig, IndexerStats, WorkflowEventIndexer};

/// Subsystem identifier used in log fields.
pub const SUBSYSTEM_NAME: &str = "audit-indexing";
