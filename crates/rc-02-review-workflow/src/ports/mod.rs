//! Ports for the review workflow.

pub mod inbound;
pub mod outbound;

pub use inbound::ReviewWorkflowApi;
pub use outbound::CallerAuthorization;
