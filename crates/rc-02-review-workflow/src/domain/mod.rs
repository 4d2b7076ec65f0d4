//! Domain layer: the project aggregate and the assessment unit state machine.
//!
//! Both types are plain data with validating methods. Locking, event
//! publication and authorization live in the service.

pub mod assessment_unit;
mod attachments;
pub mod project;

pub use assessment_unit::{
    Assessment, AssessmentUnit, Completion, DeadlinePolicy, FinalizeOutcome, UnitState,
};
pub use project::{AssessmentProviderEntry, DocumentSendRequest, ProjectAggregate, ProviderRemoval};
