//! # Registry Authorization Adapter
//!
//! Answers the workflow's `CallerAuthorization` port from the live
//! access-control registry, so authorizing or unauthorizing a caller takes
//! effect on the next workflow call.

use rc_01_access_control::{AccessControlApi, AccessControlService};
use rc_02_review_workflow::CallerAuthorization;
use shared_types::Address;
use std::sync::Arc;

/// Adapter: registry → workflow authorization port.
pub struct RegistryAuthorization {
    registry: Arc<AccessControlService>,
}

impl RegistryAuthorization {
    pub fn new(registry: Arc<AccessControlService>) -> Self {
        Self { registry }
    }
}

impl CallerAuthorization for RegistryAuthorization {
    fn is_authorized(&self, caller: &Address) -> bool {
        self.registry.is_authorized(caller)
    }
}
