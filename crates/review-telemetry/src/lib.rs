//! # Review Telemetry
//!
//! Observability for Review-Chain: structured logging through `tracing` and
//! Prometheus counters for workflow transitions and the audit pipeline.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use review_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `review-chain` | Service name attached to logs |
//! | `RC_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `RC_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |
//! | `RC_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |

#![warn(clippy::all)]

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, record_audit_dead_letter, record_audit_duplicate, record_audit_retry,
    record_audit_written, record_rejection, record_transition, register_metrics, MetricsHandle,
};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and metrics.
///
/// Returns the metrics handle; it may be dropped, the registry is global.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<MetricsHandle, TelemetryError> {
    let handle = register_metrics()?;
    init_tracing(config)?;
    Ok(handle)
}
