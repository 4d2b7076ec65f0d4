//! Adapters for the audit store port.

pub mod memory;

pub use memory::InMemoryAuditStore;
