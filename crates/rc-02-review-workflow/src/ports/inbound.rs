//! # Inbound Port
//!
//! Every operation the workflow exposes. Each mutator takes the calling
//! identity first and is gated by registry authorization before any role
//! check.

use crate::domain::{Assessment, AssessmentUnit, DocumentSendRequest, ProjectAggregate};
use shared_types::{Address, Document, ProjectId, Timestamp, UnitId, WorkflowResult};

/// Review workflow API.
pub trait ReviewWorkflowApi: Send + Sync {
    // =========================================================================
    // PROJECT
    // =========================================================================

    /// Creates a project managed by `caller`.
    fn create_project(&self, caller: Address) -> WorkflowResult<ProjectId>;

    /// Returns the providers that were newly added.
    fn add_assessment_providers(
        &self,
        caller: Address,
        project: ProjectId,
        ids: &[Address],
    ) -> WorkflowResult<Vec<Address>>;

    /// Returns the providers that were removed.
    fn remove_assessment_providers(
        &self,
        caller: Address,
        project: ProjectId,
        ids: &[Address],
    ) -> WorkflowResult<Vec<Address>>;

    fn set_administrative_authority(
        &self,
        caller: Address,
        project: ProjectId,
        authority: Address,
    ) -> WorkflowResult<()>;

    fn remove_administrative_authority(&self, caller: Address, project: ProjectId)
        -> WorkflowResult<()>;

    fn change_administrative_authority(
        &self,
        caller: Address,
        project: ProjectId,
        authority: Address,
    ) -> WorkflowResult<()>;

    fn set_dpp(&self, caller: Address, project: ProjectId, document: Document) -> WorkflowResult<()>;

    fn set_dgd(&self, caller: Address, project: ProjectId, document: Document) -> WorkflowResult<()>;

    /// Returns the created units in entry order.
    fn send_dpp(
        &self,
        caller: Address,
        project: ProjectId,
        entries: Vec<DocumentSendRequest>,
    ) -> WorkflowResult<Vec<UnitId>>;

    /// Returns the created units in entry order.
    fn send_dgd(
        &self,
        caller: Address,
        project: ProjectId,
        entries: Vec<DocumentSendRequest>,
    ) -> WorkflowResult<Vec<UnitId>>;

    // =========================================================================
    // ASSESSMENT UNIT - MANAGER
    // =========================================================================

    fn add_attachments(
        &self,
        caller: Address,
        unit: UnitId,
        documents: Vec<Document>,
    ) -> WorkflowResult<()>;

    fn remove_attachments(&self, caller: Address, unit: UnitId, ids: &[String])
        -> WorkflowResult<()>;

    fn update_main_document(&self, caller: Address, unit: UnitId, document: Document)
        -> WorkflowResult<()>;

    fn evaluate_assessment_due_date_extension(
        &self,
        caller: Address,
        unit: UnitId,
        accept: bool,
    ) -> WorkflowResult<()>;

    fn finalize_assessment(&self, caller: Address, unit: UnitId) -> WorkflowResult<()>;

    // =========================================================================
    // ASSESSMENT UNIT - PROVIDER
    // =========================================================================

    fn request_main_document_update(&self, caller: Address, unit: UnitId) -> WorkflowResult<()>;

    fn request_assessment_due_date_extension(
        &self,
        caller: Address,
        unit: UnitId,
        requested: Timestamp,
    ) -> WorkflowResult<()>;

    fn provide_assessment(
        &self,
        caller: Address,
        unit: UnitId,
        assessment: Assessment,
        requires_further_assessment: bool,
    ) -> WorkflowResult<()>;

    fn add_assessment_attachments(
        &self,
        caller: Address,
        unit: UnitId,
        documents: Vec<Document>,
    ) -> WorkflowResult<()>;

    fn remove_assessment_attachments(
        &self,
        caller: Address,
        unit: UnitId,
        ids: &[String],
    ) -> WorkflowResult<()>;

    fn update_assessment_main_document(
        &self,
        caller: Address,
        unit: UnitId,
        document: Document,
    ) -> WorkflowResult<()>;

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Snapshot of a project.
    fn project(&self, project: ProjectId) -> WorkflowResult<ProjectAggregate>;

    /// Snapshot of a unit.
    fn assessment_unit(&self, unit: UnitId) -> WorkflowResult<AssessmentUnit>;
}
