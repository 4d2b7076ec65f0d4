//! Domain layer: audit records and store errors.

pub mod errors;
pub mod record;

pub use errors::StoreError;
pub use record::{describe, to_datetime, AuditKey, AuditRecord};
