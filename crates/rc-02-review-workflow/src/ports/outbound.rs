//! # Outbound Ports
//!
//! What the workflow needs from the rest of the node.

use shared_types::Address;

/// Answers whether a caller may invoke workflow operations at all.
///
/// Implemented by an adapter over the access-control registry.
pub trait CallerAuthorization: Send + Sync {
    fn is_authorized(&self, caller: &Address) -> bool;
}
