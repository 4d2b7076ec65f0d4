//! # Access Control Service
//!
//! Wraps the registry in a lock, publishes one event per effective change and
//! records rejections.

use crate::domain::AccessRegistry;
use crate::ports::AccessControlApi;
use crate::SUBSYSTEM_NAME;
use parking_lot::RwLock;
use shared_bus::{EntityRef, EventPublisher, WorkflowEvent};
use shared_types::{Address, TimeSource, WorkflowResult};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Thread-safe registry service.
pub struct AccessControlService {
    registry: RwLock<AccessRegistry>,
    publisher: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
}

impl AccessControlService {
    pub fn new(
        bootstrap_owner: Address,
        publisher: Arc<dyn EventPublisher>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        info!(
            subsystem = SUBSYSTEM_NAME,
            owner = %bootstrap_owner,
            "Access control registry bootstrapped"
        );
        Self {
            registry: RwLock::new(AccessRegistry::new(bootstrap_owner)),
            publisher,
            time,
        }
    }

    /// Snapshot of the registry.
    #[must_use]
    pub fn snapshot(&self) -> AccessRegistry {
        self.registry.read().clone()
    }

    /// Applies `op` under the write lock and publishes while still holding it.
    fn commit<F, E>(&self, operation: &'static str, caller: Address, op: F, event: E)
        -> WorkflowResult<Vec<Address>>
    where
        F: FnOnce(&mut AccessRegistry) -> WorkflowResult<Vec<Address>>,
        E: FnOnce(Vec<Address>) -> WorkflowEvent,
    {
        let mut registry = self.registry.write();
        match op(&mut registry) {
            Ok(changed) => {
                if !changed.is_empty() {
                    let event = event(changed.clone());
                    review_telemetry::record_transition(event.name());
                    self.publisher
                        .publish(EntityRef::Registry, self.time.now(), event);
                    info!(
                        subsystem = SUBSYSTEM_NAME,
                        operation,
                        caller = %caller,
                        changed = changed.len(),
                        "Registry updated"
                    );
                }
                Ok(changed)
            }
            Err(e) => {
                review_telemetry::record_rejection(operation, e.kind().as_str());
                warn!(
                    subsystem = SUBSYSTEM_NAME,
                    operation,
                    caller = %caller,
                    error = %e,
                    "Registry operation rejected"
                );
                Err(e)
            }
        }
    }
}

impl AccessControlApi for AccessControlService {
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    fn add_owners(&self, caller: Address, ids: &[Address]) -> WorkflowResult<Vec<Address>> {
        self.commit(
            "add_owners",
            caller,
            |r| r.add_owners(&caller, ids),
            |ids| WorkflowEvent::OwnersAdded { ids },
        )
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    fn remove_owners(&self, caller: Address, ids: &[Address]) -> WorkflowResult<Vec<Address>> {
        self.commit(
            "remove_owners",
            caller,
            |r| r.remove_owners(&caller, ids),
            |ids| WorkflowEvent::OwnersRemoved { ids },
        )
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    fn authorize_callers(&self, caller: Address, ids: &[Address]) -> WorkflowResult<Vec<Address>> {
        self.commit(
            "authorize_callers",
            caller,
            |r| r.authorize_callers(&caller, ids),
            |ids| WorkflowEvent::CallersAuthorized { ids },
        )
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    fn unauthorize_callers(
        &self,
        caller: Address,
        ids: &[Address],
    ) -> WorkflowResult<Vec<Address>> {
        self.commit(
            "unauthorize_callers",
            caller,
            |r| r.unauthorize_callers(&caller, ids),
            |ids| WorkflowEvent::CallersUnauthorized { ids },
        )
    }

    fn is_owner(&self, id: &Address) -> bool {
        self.registry.read().is_owner(id)
    }

    fn is_authorized(&self, id: &Address) -> bool {
        self.registry.read().is_authorized(id)
    }
}
