//! # RC-01 Access Control - Caller Authorization Registry
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Decides who may invoke mutating workflow operations at all. Two independent
//! membership sets are kept:
//!
//! - **Owners** administer the registry itself.
//! - **Authorized callers** may call the workflow.
//!
//! Being an owner does not imply being an authorized caller.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Only owners mutate membership | `domain/registry.rs` - `require_owner()` |
//! | Owner set is never empty | `domain/registry.rs` - `remove_owners()` |
//! | Batches are per-element idempotent | every mutator returns only the ids it changed |
//!
//! ## Events
//!
//! One event per mutator call that changed at least one membership:
//! `OwnersAdded`, `OwnersRemoved`, `CallersAuthorized`, `CallersUnauthorized`.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::domain::AccessRegistry;
    pub use crate::ports::AccessControlApi;
    pub use crate::service::AccessControlService;
}

pub use domain::AccessRegistry;
pub use ports::AccessControlApi;
pub use service::AccessControlService;

/// Subsystem identifier used in log fields.
pub const SUBSYSTEM_NAME: &str = "access-control";
