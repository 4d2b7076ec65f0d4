//! # Service Container
//!
//! Central container holding the subsystem instances with their shared
//! infrastructure and dependency injection.

pub mod config;
pub mod services;

pub use config::{load_config, load_config_from, ConfigError, NodeConfig};
pub use services::ServiceContainer;
