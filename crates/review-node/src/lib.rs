//! # Review Node Library
//!
//! This library exposes the node's wiring for testing. The main entry point
//! is the `main.rs` binary.
//!
//! ## Architectural Patterns
//!
//! - **EDA (Event-Driven Architecture)**: every committed transition is published on the bus
//! - **DDD (Domain-Driven Design)**: each subsystem owns its domain logic
//! - **Hexagonal Architecture**: ports define contracts, adapters implement them

#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod container;

pub use container::{load_config, ConfigError, NodeConfig, ServiceContainer};
