//! # Review-Chain Test Suite
//!
//! Unified test crate for scenarios that span more than one subsystem.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # Wired node with a manual clock
//! └── integration/
//!     ├── review_round.rs   # Registry + workflow end to end
//!     ├── concurrency.rs    # Parallel reviewers, per-entity ordering
//!     └── audit_trail.rs    # Bus → indexer → store
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p rc-tests
//!
//! # By category
//! cargo test -p rc-tests integration::concurrency::
//! ```

#![allow(dead_code)]

#[cfg(test)]
pub(crate) mod fixtures;
pub mod integration;
