//! # Assessment Unit
//!
//! The per-document, per-reviewer state machine.
//!
//! ```text
//!            provide_assessment            finalize_assessment
//!   ┌──────┐ ─────────────────► ┌──────────┐ ─────────────────► ┌───────────┐
//!   │ Open │                    │ Assessed │                    │ Finalized │
//!   └──────┘ ─────────────────────────────────────────────────► └───────────┘
//!        finalize_assessment after the due date (tacit consent)
//! ```
//!
//! Every method validates completely before touching state, so a returned
//! error always means nothing changed.

use super::attachments::{AttachmentList, ensure_owned};
use serde::{Deserialize, Serialize};
use shared_types::{
    Address, Document, DocumentType, ProjectId, Role, Timestamp, UnitId, WorkflowError,
    WorkflowResult,
};

/// Lifecycle state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitState {
    Open,
    Assessed,
    Finalized,
}

/// The reviewer's feedback. `date_provided == 0` means not yet provided.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub date_provided: Timestamp,
    pub main_document: Option<Document>,
    pub attachments: Vec<Document>,
}

impl Assessment {
    /// Builds a submission. The provided date is assigned on acceptance.
    #[must_use]
    pub fn new(main_document: Option<Document>, attachments: Vec<Document>) -> Self {
        Self {
            date_provided: 0,
            main_document,
            attachments,
        }
    }

    #[must_use]
    pub fn is_provided(&self) -> bool {
        self.date_provided != 0
    }
}

/// Deadline parameters applied by unit operations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlinePolicy {
    /// Added to the due date on each main-document update request.
    pub update_request_extension: u64,
    /// Latest acceptable extension, measured from the unit's creation.
    pub extension_window: u64,
}

/// Effect of an accepted assessment, to be applied to the owning project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub document_type: DocumentType,
    pub assessment_provider: Address,
    pub requires_further_assessment: bool,
}

/// Result of finalizing a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// An assessment had been provided earlier.
    Finalized,
    /// No assessment arrived before the deadline; counts as one.
    DeadlineExceeded(Completion),
}

/// One document sent to one reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentUnit {
    pub id: UnitId,
    pub project: ProjectId,
    pub project_manager: Address,
    pub assessment_provider: Address,
    pub main_document: Document,
    pub main_document_type: DocumentType,
    attachments: AttachmentList,
    pub main_document_update_requested: bool,
    pub date_created: Timestamp,
    pub assessment_due_date: Timestamp,
    /// Pending extension request; 0 when none.
    pub requested_assessment_due_date: Timestamp,
    pub assessment: Assessment,
    pub assessment_finished: bool,
    pub closed: bool,
    /// Closed because the reviewer was removed from the project.
    pub withdrawn: bool,
    pub state: UnitState,
}

impl AssessmentUnit {
    /// Creates an open unit. Attachments must already be validated as unique.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: UnitId,
        project: ProjectId,
        project_manager: Address,
        assessment_provider: Address,
        main_document: Document,
        main_document_type: DocumentType,
        attachments: Vec<Document>,
        date_created: Timestamp,
        assessment_due_date: Timestamp,
    ) -> Self {
        Self {
            id,
            project,
            project_manager,
            assessment_provider,
            main_document,
            main_document_type,
            attachments: AttachmentList::from_validated(attachments),
            main_document_update_requested: false,
            date_created,
            assessment_due_date,
            requested_assessment_due_date: 0,
            assessment: Assessment::default(),
            assessment_finished: false,
            closed: false,
            withdrawn: false,
            state: UnitState::Open,
        }
    }

    #[must_use]
    pub fn attachments(&self) -> &[Document] {
        self.attachments.as_slice()
    }

    /// True while the reviewer still owes an assessment.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state == UnitState::Open && !self.closed
    }

    // =========================================================================
    // GUARDS
    // =========================================================================

    fn require_manager(&self, caller: &Address) -> WorkflowResult<()> {
        if *caller == self.project_manager {
            Ok(())
        } else {
            Err(WorkflowError::unauthorized(*caller, Role::ProjectManager))
        }
    }

    fn require_provider(&self, caller: &Address) -> WorkflowResult<()> {
        if *caller == self.assessment_provider {
            Ok(())
        } else {
            Err(WorkflowError::unauthorized(*caller, Role::AssessmentProvider))
        }
    }

    fn require_pending(&self) -> WorkflowResult<()> {
        if self.withdrawn {
            return Err(WorkflowError::invalid_state("assessment unit has been withdrawn"));
        }
        if !self.is_pending() {
            return Err(WorkflowError::invalid_state(
                "assessment has already been provided or finalized",
            ));
        }
        Ok(())
    }

    fn require_amendable_assessment(&self) -> WorkflowResult<()> {
        match self.state {
            UnitState::Open => Err(WorkflowError::invalid_state(
                "assessment has not been provided yet",
            )),
            UnitState::Finalized => Err(WorkflowError::invalid_state(
                "assessment has been finalized",
            )),
            UnitState::Assessed if self.closed => {
                Err(WorkflowError::invalid_state("assessment unit is closed"))
            }
            UnitState::Assessed => Ok(()),
        }
    }

    // =========================================================================
    // MANAGER OPERATIONS
    // =========================================================================

    /// Returns the ids that were attached.
    pub fn add_attachments(
        &mut self,
        caller: &Address,
        documents: Vec<Document>,
    ) -> WorkflowResult<Vec<String>> {
        self.require_manager(caller)?;
        self.require_pending()?;
        self.attachments.append(documents)
    }

    /// Returns the ids that were actually removed.
    pub fn remove_attachments(
        &mut self,
        caller: &Address,
        ids: &[String],
    ) -> WorkflowResult<Vec<String>> {
        self.require_manager(caller)?;
        self.require_pending()?;
        Ok(self.attachments.remove(ids))
    }

    /// Replaces the main document and answers any outstanding update request.
    pub fn update_main_document(&mut self, caller: &Address, document: Document) -> WorkflowResult<()> {
        self.require_manager(caller)?;
        self.require_pending()?;
        self.main_document = document;
        self.main_document_update_requested = false;
        Ok(())
    }

    /// Applies the reviewer's pending extension request.
    ///
    /// Returns the resulting due date.
    pub fn evaluate_assessment_due_date_extension(
        &mut self,
        caller: &Address,
        accept: bool,
    ) -> WorkflowResult<Timestamp> {
        self.require_manager(caller)?;
        if self.withdrawn || self.state == UnitState::Finalized {
            return Err(WorkflowError::invalid_state("assessment unit is no longer active"));
        }
        if self.requested_assessment_due_date == 0 {
            return Err(WorkflowError::invalid_state(
                "no assessment due date extension has been requested",
            ));
        }
        if accept {
            self.assessment_due_date = self
                .assessment_due_date
                .max(self.requested_assessment_due_date);
        }
        self.requested_assessment_due_date = 0;
        Ok(self.assessment_due_date)
    }

    /// Closes the assessment once the due date has passed.
    pub fn finalize_assessment(
        &mut self,
        caller: &Address,
        now: Timestamp,
    ) -> WorkflowResult<FinalizeOutcome> {
        self.require_manager(caller)?;
        if self.withdrawn {
            return Err(WorkflowError::invalid_state("assessment unit has been withdrawn"));
        }
        if self.state == UnitState::Finalized {
            return Err(WorkflowError::invalid_state("assessment has already been finalized"));
        }
        if now < self.assessment_due_date {
            return Err(WorkflowError::invalid_state(
                "assessment due date has not passed yet",
            ));
        }

        let tacit = !self.assessment_finished;
        self.state = UnitState::Finalized;
        self.assessment_finished = true;

        if tacit {
            Ok(FinalizeOutcome::DeadlineExceeded(Completion {
                document_type: self.main_document_type,
                assessment_provider: self.assessment_provider,
                requires_further_assessment: true,
            }))
        } else {
            Ok(FinalizeOutcome::Finalized)
        }
    }

    // =========================================================================
    // PROVIDER OPERATIONS
    // =========================================================================

    /// Flags the main document for revision and pushes the deadline out.
    ///
    /// Repeated requests each extend the current due date.
    pub fn request_main_document_update(
        &mut self,
        caller: &Address,
        policy: &DeadlinePolicy,
    ) -> WorkflowResult<Timestamp> {
        self.require_provider(caller)?;
        self.require_pending()?;
        self.main_document_update_requested = true;
        self.assessment_due_date = self
            .assessment_due_date
            .saturating_add(policy.update_request_extension);
        Ok(self.assessment_due_date)
    }

    pub fn request_assessment_due_date_extension(
        &mut self,
        caller: &Address,
        requested: Timestamp,
        policy: &DeadlinePolicy,
    ) -> WorkflowResult<()> {
        self.require_provider(caller)?;
        self.require_pending()?;
        if requested <= self.assessment_due_date {
            return Err(WorkflowError::invalid_argument(
                "requested due date must be later than the current due date",
            ));
        }
        let latest = self.date_created.saturating_add(policy.extension_window);
        if requested > latest {
            return Err(WorkflowError::invalid_argument(format!(
                "requested due date exceeds the extension window ending at {latest}"
            )));
        }
        self.requested_assessment_due_date = requested;
        Ok(())
    }

    /// Accepts the reviewer's feedback. The provided date is always `now`.
    pub fn provide_assessment(
        &mut self,
        caller: &Address,
        assessment: Assessment,
        requires_further_assessment: bool,
        now: Timestamp,
    ) -> WorkflowResult<Completion> {
        self.require_provider(caller)?;
        self.require_pending()?;
        if let Some(doc) = &assessment.main_document {
            ensure_owned(doc, caller)?;
        }
        let attachments = AttachmentList::validated(assessment.attachments, Some(caller))?;

        self.assessment = Assessment {
            date_provided: now,
            main_document: assessment.main_document,
            attachments: attachments.into_vec(),
        };
        self.state = UnitState::Assessed;
        self.assessment_finished = true;
        self.closed = !requires_further_assessment;

        Ok(Completion {
            document_type: self.main_document_type,
            assessment_provider: self.assessment_provider,
            requires_further_assessment,
        })
    }

    pub fn add_assessment_attachments(
        &mut self,
        caller: &Address,
        documents: Vec<Document>,
    ) -> WorkflowResult<Vec<String>> {
        self.require_provider(caller)?;
        self.require_amendable_assessment()?;
        for doc in &documents {
            ensure_owned(doc, caller)?;
        }
        let mut list = AttachmentList::from_validated(std::mem::take(&mut self.assessment.attachments));
        let result = list.append(documents);
        self.assessment.attachments = list.into_vec();
        result
    }

    pub fn remove_assessment_attachments(
        &mut self,
        caller: &Address,
        ids: &[String],
    ) -> WorkflowResult<Vec<String>> {
        self.require_provider(caller)?;
        self.require_amendable_assessment()?;
        let mut list = AttachmentList::from_validated(std::mem::take(&mut self.assessment.attachments));
        let removed = list.remove(ids);
        self.assessment.attachments = list.into_vec();
        Ok(removed)
    }

    pub fn update_assessment_main_document(
        &mut self,
        caller: &Address,
        document: Document,
    ) -> WorkflowResult<()> {
        self.require_provider(caller)?;
        self.require_amendable_assessment()?;
        ensure_owned(&document, caller)?;
        self.assessment.main_document = Some(document);
        Ok(())
    }

    // =========================================================================
    // PROJECT-DRIVEN TRANSITIONS
    // =========================================================================

    /// Clears the update flag after the project replaced its document.
    pub(crate) fn acknowledge_document_replaced(&mut self) {
        if self.is_pending() {
            self.main_document_update_requested = false;
        }
    }

    /// Closes a pending unit whose reviewer left the project.
    pub(crate) fn withdraw(&mut self) {
        self.closed = true;
        self.withdrawn = true;
    }
}
