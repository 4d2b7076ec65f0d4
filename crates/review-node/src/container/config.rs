//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! ## Environment Overrides
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RC_BOOTSTRAP_OWNER` | none (required) | First registry owner, 40 hex chars |
//! | `RC_ASSESSMENT_PERIOD_DAYS` | `30` | Due date when a send omits one |
//! | `RC_UPDATE_EXTENSION_DAYS` | `15` | Added per main-document update request |
//! | `RC_EXTENSION_WINDOW_DAYS` | `60` | Latest extension, from unit creation |
//! | `RC_AUDIT_MAX_ATTEMPTS` | `5` | Store write attempts per envelope |
//! | `RC_AUDIT_INITIAL_BACKOFF_MS` | `50` | First retry delay |
//! | `RC_AUDIT_MAX_BACKOFF_MS` | `2000` | Retry delay cap |
//! | `RC_AUDIT_WRITE_TIMEOUT_MS` | `5000` | Timeout per store write |
//! | `RC_AUDIT_DEAD_LETTER_CAPACITY` | `1024` | Dead letters kept in memory |

use rc_02_review_workflow::WorkflowConfig;
use rc_03_audit_indexing::IndexerConfig;
use shared_types::Address;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// First owner of the access-control registry.
    pub bootstrap_owner: Option<Address>,
    /// Review workflow timing.
    pub workflow: WorkflowConfig,
    /// Audit indexer retry settings.
    pub indexer: IndexerConfig,
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("RC_BOOTSTRAP_OWNER is not set; the registry needs a first owner")]
    MissingBootstrapOwner,

    #[error("bootstrap owner must not be the zero address")]
    ZeroBootstrapOwner,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

impl NodeConfig {
    /// Validate configuration before wiring.
    ///
    /// # Returns
    ///
    /// The bootstrap owner, or `Err` if:
    /// - no bootstrap owner is configured, or it is the zero address
    /// - the assessment period or the attempt count is zero
    pub fn validate(&self) -> Result<Address, ConfigError> {
        let owner = self
            .bootstrap_owner
            .ok_or(ConfigError::MissingBootstrapOwner)?;
        if owner.is_zero() {
            return Err(ConfigError::ZeroBootstrapOwner);
        }
        if self.workflow.assessment_period_days == 0 {
            return Err(ConfigError::ZeroValue("assessment period"));
        }
        if self.indexer.max_attempts == 0 {
            return Err(ConfigError::ZeroValue("audit max attempts"));
        }
        Ok(owner)
    }
}

/// Load configuration from the process environment.
pub fn load_config() -> NodeConfig {
    load_config_from(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary variable lookup.
///
/// Malformed values are logged and ignored.
pub fn load_config_from<F>(lookup: F) -> NodeConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = NodeConfig::default();

    if let Some(owner_hex) = lookup("RC_BOOTSTRAP_OWNER") {
        match Address::from_hex(owner_hex.trim()) {
            Some(owner) => {
                info!(owner = %owner, "Loaded bootstrap owner from environment");
                config.bootstrap_owner = Some(owner);
            }
            None => warn!("RC_BOOTSTRAP_OWNER must be 20 bytes (40 hex chars)"),
        }
    }

    let workflow = &mut config.workflow;
    override_with(&lookup, "RC_ASSESSMENT_PERIOD_DAYS", &mut workflow.assessment_period_days);
    override_with(&lookup, "RC_UPDATE_EXTENSION_DAYS", &mut workflow.update_request_extension_days);
    override_with(&lookup, "RC_EXTENSION_WINDOW_DAYS", &mut workflow.extension_window_days);

    let indexer = &mut config.indexer;
    override_with(&lookup, "RC_AUDIT_MAX_ATTEMPTS", &mut indexer.max_attempts);
    override_millis(&lookup, "RC_AUDIT_INITIAL_BACKOFF_MS", &mut indexer.initial_backoff);
    override_millis(&lookup, "RC_AUDIT_MAX_BACKOFF_MS", &mut indexer.max_backoff);
    override_millis(&lookup, "RC_AUDIT_WRITE_TIMEOUT_MS", &mut indexer.write_timeout);
    override_with(&lookup, "RC_AUDIT_DEAD_LETTER_CAPACITY", &mut indexer.dead_letter_capacity);

    config
}

fn override_with<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => warn!(key, value = raw.as_str(), "Ignoring malformed override"),
        }
    }
}

fn override_millis<F>(lookup: &F, key: &str, target: &mut Duration)
where
    F: Fn(&str) -> Option<String>,
{
    let mut millis = target.as_millis() as u64;
    override_with(lookup, key, &mut millis);
    *target = Duration::from_millis(millis);
}
