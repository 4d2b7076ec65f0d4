//! # Store Errors
//!
//! Failures of the audit store. They stay inside the indexer and never
//! reach workflow callers.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by an [`AuditStore`](crate::ports::AuditStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or temporarily failing.
    #[error("audit store unavailable: {0}")]
    Unavailable(String),

    /// A write did not complete in time.
    #[error("audit store write timed out after {0:?}")]
    Timeout(Duration),

    /// The backend refused the record. Retrying will not help.
    #[error("audit record rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Whether a later attempt may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}
