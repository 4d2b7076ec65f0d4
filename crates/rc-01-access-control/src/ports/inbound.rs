//! # Inbound Port
//!
//! The API the registry exposes to transports and to the workflow wiring.

use shared_types::{Address, WorkflowResult};

/// Access-control registry API.
///
/// Mutators return the ids whose membership actually changed.
pub trait AccessControlApi: Send + Sync {
    fn add_owners(&self, caller: Address, ids: &[Address]) -> WorkflowResult<Vec<Address>>;

    fn remove_owners(&self, caller: Address, ids: &[Address]) -> WorkflowResult<Vec<Address>>;

    fn authorize_callers(&self, caller: Address, ids: &[Address]) -> WorkflowResult<Vec<Address>>;

    fn unauthorize_callers(&self, caller: Address, ids: &[Address])
        -> WorkflowResult<Vec<Address>>;

    fn is_owner(&self, id: &Address) -> bool;

    fn is_authorized(&self, id: &Address) -> bool;
}
