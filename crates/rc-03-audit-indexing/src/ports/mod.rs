//! Ports for the audit indexer.

pub mod outbound;

pub use outbound::AuditStore;
