//! # Service Container
//!
//! Holds all subsystem instances and the infrastructure they share.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: Event bus, time source
//! Level 1: Access control registry (bootstrap owner)
//! Level 2: Review workflow (authorization via the registry)
//! Level 3: Audit store and indexer (bus consumer)
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use rc_01_access_control::AccessControlService;
use rc_02_review_workflow::ReviewWorkflowService;
use rc_03_audit_indexing::{AuditStore, InMemoryAuditStore, WorkflowEventIndexer};
use shared_bus::{EventFilter, InMemoryEventBus};
use shared_types::{Address, SystemTimeSource, TimeSource};

use crate::adapters::RegistryAuthorization;
use crate::container::config::NodeConfig;

/// Central container holding all subsystem instances.
pub struct ServiceContainer {
    // =========================================================================
    // SHARED INFRASTRUCTURE
    // =========================================================================
    pub event_bus: Arc<InMemoryEventBus>,
    pub time: Arc<dyn TimeSource>,

    // =========================================================================
    // SUBSYSTEMS
    // =========================================================================
    /// Access Control (Subsystem 1)
    pub access_control: Arc<AccessControlService>,

    /// Review Workflow (Subsystem 2)
    /// Depends on Access Control for caller authorization.
    pub workflow: Arc<ReviewWorkflowService>,

    /// Audit Indexing (Subsystem 3)
    pub audit_store: Arc<InMemoryAuditStore>,
    pub indexer: Arc<WorkflowEventIndexer>,
}

impl ServiceContainer {
    /// Wires every subsystem with the system clock.
    pub fn new(config: &NodeConfig, bootstrap_owner: Address) -> Self {
        Self::with_time(config, bootstrap_owner, Arc::new(SystemTimeSource))
    }

    /// Wires every subsystem against the given clock.
    #[instrument(skip(config, time))]
    pub fn with_time(
        config: &NodeConfig,
        bootstrap_owner: Address,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let event_bus = Arc::new(InMemoryEventBus::new());

        let access_control = Arc::new(AccessControlService::new(
            bootstrap_owner,
            event_bus.clone(),
            time.clone(),
        ));

        let workflow = Arc::new(ReviewWorkflowService::new(
            config.workflow,
            Arc::new(RegistryAuthorization::new(access_control.clone())),
            event_bus.clone(),
            time.clone(),
        ));

        let audit_store = Arc::new(InMemoryAuditStore::new());
        let store: Arc<dyn AuditStore> = audit_store.clone();
        let indexer = Arc::new(WorkflowEventIndexer::new(store, config.indexer));

        info!("All subsystems wired");
        Self {
            event_bus,
            time,
            access_control,
            workflow,
            audit_store,
            indexer,
        }
    }

    /// Subscribes the indexer to every topic and runs it until `shutdown`
    /// flips.
    pub fn spawn_indexer(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let subscription = self.event_bus.subscribe(EventFilter::all());
        tokio::spawn(self.indexer.clone().run(subscription, shutdown))
    }
}
