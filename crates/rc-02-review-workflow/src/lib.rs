//! # RC-02 Review Workflow - Projects and Assessment Units
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Runs the two-round document review. A project manager registers
//! assessment providers, sets the DPP and later the DGD (the two sequential
//! project documents), and sends each to reviewers. Every send
//! creates one assessment unit per reviewer, which then moves through its own
//! state machine:
//!
//! ```text
//!            provide_assessment             finalize_assessment
//!   [Open] ─────────────────────► [Assessed] ─────────────────────► [Finalized]
//!      │                                                                 ▲
//!      └──────────────── finalize_assessment (tacit consent) ────────────┘
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Every mutator requires an authorized caller | `service.rs` - `guarded()` |
//! | One unit per reviewer per round | `domain/project.rs` - `send_documents()` |
//! | Sends validate the whole batch before creating units | `domain/project.rs` - `send_documents()` |
//! | Due dates only move forward | `domain/assessment_unit.rs` |
//! | Assessed counts never exceed the provider count | `domain/project.rs` - `record_completion()` |
//! | The project closes once every DGD is assessed | `domain/project.rs` - `check_round_milestones()` |
//!
//! ## Concurrency
//!
//! Projects and units are locked individually, project before unit. Events
//! for one entity are published in commit order.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_arguments)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::domain::{
        Assessment, AssessmentUnit, DocumentSendRequest, ProjectAggregate, UnitState,
    };
    pub use crate::ports::{CallerAuthorization, ReviewWorkflowApi};
    pub use crate::service::{ReviewWorkflowService, WorkflowConfig};
}

pub use domain::{
    Assessment, AssessmentProviderEntry, AssessmentUnit, Completion, DeadlinePolicy,
    DocumentSendRequest, FinalizeOutcome, ProjectAggregate, ProviderRemoval, UnitState,
};
pub use ports::{CallerAuthorization, ReviewWorkflowApi};
pub use service::{ReviewWorkflowService, ServiceStats, WorkflowConfig};

/// Subsystem identifier used in log fields.
pub const SUBSYSTEM_NAME: &str = "review-workflow";
