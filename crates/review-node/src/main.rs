//! # Review-Chain Node
//!
//! The main entry point for a Review-Chain node.
//!
//! ## Flow
//!
//! ```text
//! Access Control(1) ──OwnersAdded/CallersAuthorized──→ Event Bus
//!        │                                                │
//!        │ is_authorized()                                │
//!        ↓                                                │
//! Review Workflow(2) ──Project/Unit transitions─────────→ │
//!                                                         ↓
//!                                                 Audit Indexing(3)
//!                                                         │
//!                                                         ↓
//!                                                   Audit Store
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logging and metrics)
//! 2. Load configuration from the environment
//! 3. Validate the bootstrap owner
//! 4. Wire subsystems in dependency order
//! 5. Start the audit indexer
//! 6. Wait for Ctrl+C, then drain and stop

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use review_node::{load_config, NodeConfig, ServiceContainer};
use review_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};

/// Upper bound for draining the indexer on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// The node runtime orchestrating all subsystems.
struct NodeRuntime {
    container: ServiceContainer,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    fn new(config: &NodeConfig) -> Result<Self> {
        let owner = config
            .validate()
            .context("invalid node configuration")?;
        let container = ServiceContainer::new(config, owner);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            container,
            shutdown_tx,
            shutdown_rx,
        })
    }

    fn start(&self) -> JoinHandle<()> {
        info!("===========================================");
        info!("  Review-Chain Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let handle = self.container.spawn_indexer(self.shutdown_rx.clone());
        info!("Audit indexer started");
        handle
    }

    async fn shutdown(&self, indexer: JoinHandle<()>) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        match tokio::time::timeout(SHUTDOWN_GRACE, indexer).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Audit indexer task failed"),
            Err(_) => warn!("Audit indexer did not stop within the grace period"),
        }

        for letter in self.container.indexer.take_dead_letters() {
            warn!(
                topic = letter.topic,
                sequence = letter.envelope.sequence,
                event = letter.envelope.event.name(),
                error = %letter.error,
                "Unindexed event at shutdown"
            );
        }

        match encode_metrics() {
            Ok(snapshot) => info!(metrics = %snapshot, "Final metrics snapshot"),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }

        let stats = self.container.indexer.stats();
        info!(
            written = stats.written,
            duplicates = stats.duplicates,
            dead_lettered = stats.dead_lettered,
            "Shutdown complete"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let config = load_config();
    let runtime = NodeRuntime::new(&config)?;
    let indexer = runtime.start();

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    runtime.shutdown(indexer).await;
    Ok(())
}
