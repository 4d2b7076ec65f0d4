//! # Review Workflow Service
//!
//! Owns every project and assessment unit and serializes their mutations.
//!
//! ## Locking
//!
//! - Each project and each unit sits behind its own mutex.
//! - Lock order is always project, then unit. A unit slot records its project
//!   outside the mutex so the project can be locked first.
//! - The id indexes are only held long enough to clone a handle.
//! - Events are published before the entity locks are released, so each
//!   entity's event order equals its commit order.

use crate::domain::{
    Assessment, AssessmentUnit, DeadlinePolicy, DocumentSendRequest, FinalizeOutcome,
    ProjectAggregate,
};
use crate::ports::{CallerAuthorization, ReviewWorkflowApi};
use crate::SUBSYSTEM_NAME;
use parking_lot::{Mutex, RwLock};
use shared_bus::{EntityRef, EventPublisher, WorkflowEvent};
use shared_types::{
    days, Address, Document, DocumentType, ProjectId, Role, TimeSource, Timestamp, UnitId,
    WorkflowError, WorkflowResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Workflow timing configuration, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Due date applied when a send entry omits one.
    pub assessment_period_days: u64,
    /// Added to the due date on each main-document update request.
    pub update_request_extension_days: u64,
    /// Latest extension, counted from the unit's creation.
    pub extension_window_days: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            assessment_period_days: 30,
            update_request_extension_days: 15,
            extension_window_days: 60,
        }
    }
}

impl WorkflowConfig {
    #[must_use]
    pub fn default_period(&self) -> u64 {
        days(self.assessment_period_days)
    }

    #[must_use]
    pub fn deadline_policy(&self) -> DeadlinePolicy {
        DeadlinePolicy {
            update_request_extension: days(self.update_request_extension_days),
            extension_window: days(self.extension_window_days),
        }
    }
}

/// Statistics for the workflow service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    pub projects_created: u64,
    pub units_created: u64,
    /// Operations that committed.
    pub operations_committed: u64,
    /// Operations rejected with an error.
    pub operations_rejected: u64,
}

#[derive(Clone)]
struct UnitSlot {
    project: ProjectId,
    unit: Arc<Mutex<AssessmentUnit>>,
}

/// The review workflow service.
pub struct ReviewWorkflowService {
    config: WorkflowConfig,
    authorization: Arc<dyn CallerAuthorization>,
    publisher: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
    projects: RwLock<HashMap<ProjectId, Arc<Mutex<ProjectAggregate>>>>,
    units: RwLock<HashMap<UnitId, UnitSlot>>,
    stats: Mutex<ServiceStats>,
}

impl ReviewWorkflowService {
    pub fn new(
        config: WorkflowConfig,
        authorization: Arc<dyn CallerAuthorization>,
        publisher: Arc<dyn EventPublisher>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            config,
            authorization,
            publisher,
            time,
            projects: RwLock::new(HashMap::new()),
            units: RwLock::new(HashMap::new()),
            stats: Mutex::new(ServiceStats::default()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> ServiceStats {
        self.stats.lock().clone()
    }

    // =========================================================================
    // PLUMBING
    // =========================================================================

    /// Runs `op` for an authorized caller and records the outcome.
    fn guarded<T, F>(&self, operation: &'static str, caller: Address, op: F) -> WorkflowResult<T>
    where
        F: FnOnce() -> WorkflowResult<T>,
    {
        let result = if self.authorization.is_authorized(&caller) {
            op()
        } else {
            Err(WorkflowError::unauthorized(caller, Role::AuthorizedCaller))
        };

        match &result {
            Ok(_) => self.stats.lock().operations_committed += 1,
            Err(e) => {
                self.stats.lock().operations_rejected += 1;
                review_telemetry::record_rejection(operation, e.kind().as_str());
                warn!(
                    component = SUBSYSTEM_NAME,
                    operation,
                    caller = %caller,
                    error = %e,
                    "Workflow operation rejected"
                );
            }
        }
        result
    }

    fn emit(&self, caller: Address, entity: EntityRef, now: Timestamp, event: WorkflowEvent) {
        let name = event.name();
        review_telemetry::record_transition(name);
        review_telemetry::log_transition!(
            info,
            SUBSYSTEM_NAME,
            "Workflow transition committed",
            entity,
            caller,
            event = name
        );
        self.publisher.publish(entity, now, event);
    }

    fn emit_rounds(
        &self,
        caller: Address,
        project: ProjectId,
        now: Timestamp,
        rounds: Vec<DocumentType>,
    ) {
        for document_type in rounds {
            self.emit(
                caller,
                EntityRef::Project(project),
                now,
                WorkflowEvent::RoundAssessed { document_type },
            );
            if document_type == DocumentType::Dgd {
                info!(component = SUBSYSTEM_NAME, project = %project, "Project closed");
            }
        }
    }

    fn project_handle(&self, id: ProjectId) -> WorkflowResult<Arc<Mutex<ProjectAggregate>>> {
        self.projects
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| WorkflowError::not_found("project", id))
    }

    fn unit_handle(&self, id: UnitId) -> WorkflowResult<UnitSlot> {
        self.units
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| WorkflowError::not_found("assessment unit", id))
    }

    fn with_project<T, F>(&self, id: ProjectId, op: F) -> WorkflowResult<T>
    where
        F: FnOnce(&mut ProjectAggregate, Timestamp) -> WorkflowResult<T>,
    {
        let handle = self.project_handle(id)?;
        let mut project = handle.lock();
        let now = self.time.now();
        op(&mut project, now)
    }

    fn with_unit<T, F>(&self, id: UnitId, op: F) -> WorkflowResult<T>
    where
        F: FnOnce(&mut ProjectAggregate, &mut AssessmentUnit, Timestamp) -> WorkflowResult<T>,
    {
        let slot = self.unit_handle(id)?;
        let handle = self.project_handle(slot.project)?;
        let mut project = handle.lock();
        let mut unit = slot.unit.lock();
        let now = self.time.now();
        op(&mut project, &mut unit, now)
    }

    fn set_document(
        &self,
        operation: &'static str,
        caller: Address,
        project_id: ProjectId,
        document_type: DocumentType,
        document: Document,
    ) -> WorkflowResult<()> {
        self.guarded(operation, caller, || {
            self.with_project(project_id, |project, now| {
                let document_id = document.id.clone();
                let sent = project.set_document(&caller, document_type, document)?;
                for unit_id in sent {
                    if let Ok(slot) = self.unit_handle(unit_id) {
                        slot.unit.lock().acknowledge_document_replaced();
                    }
                }
                self.emit(
                    caller,
                    EntityRef::Project(project_id),
                    now,
                    WorkflowEvent::DocumentSet {
                        document_type,
                        document_id,
                    },
                );
                Ok(())
            })
        })
    }

    fn send(
        &self,
        operation: &'static str,
        caller: Address,
        project_id: ProjectId,
        document_type: DocumentType,
        entries: Vec<DocumentSendRequest>,
    ) -> WorkflowResult<Vec<UnitId>> {
        self.guarded(operation, caller, || {
            self.with_project(project_id, |project, now| {
                let units = project.send_documents(
                    &caller,
                    document_type,
                    entries,
                    now,
                    self.config.default_period(),
                )?;

                let mut created = Vec::with_capacity(units.len());
                {
                    let mut index = self.units.write();
                    for unit in units {
                        created.push((
                            unit.id,
                            WorkflowEvent::AssessmentUnitCreated {
                                project: project_id,
                                assessment_provider: unit.assessment_provider,
                                document_type,
                                assessment_due_date: unit.assessment_due_date,
                            },
                            unit.assessment_provider,
                        ));
                        index.insert(
                            unit.id,
                            UnitSlot {
                                project: project_id,
                                unit: Arc::new(Mutex::new(unit)),
                            },
                        );
                    }
                }
                self.stats.lock().units_created += created.len() as u64;

                let mut sent = Vec::with_capacity(created.len());
                for (unit_id, event, provider) in created {
                    self.emit(caller, EntityRef::Unit(unit_id), now, event);
                    sent.push((provider, unit_id));
                }
                let ids = sent.iter().map(|(_, id)| *id).collect();
                if !sent.is_empty() {
                    self.emit(
                        caller,
                        EntityRef::Project(project_id),
                        now,
                        WorkflowEvent::DocumentSent {
                            document_type,
                            units: sent,
                        },
                    );
                }
                Ok(ids)
            })
        })
    }
}

impl ReviewWorkflowApi for ReviewWorkflowService {
    #[instrument(skip(self))]
    fn create_project(&self, caller: Address) -> WorkflowResult<ProjectId> {
        self.guarded("create_project", caller, || {
            let id = ProjectId::new();
            let now = self.time.now();
            let project = Arc::new(Mutex::new(ProjectAggregate::new(id, caller, now)));
            self.projects.write().insert(id, project);
            self.stats.lock().projects_created += 1;
            self.emit(
                caller,
                EntityRef::Project(id),
                now,
                WorkflowEvent::ProjectCreated { manager: caller },
            );
            Ok(id)
        })
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    fn add_assessment_providers(
        &self,
        caller: Address,
        project: ProjectId,
        ids: &[Address],
    ) -> WorkflowResult<Vec<Address>> {
        self.guarded("add_assessment_providers", caller, || {
            self.with_project(project, |p, now| {
                let added = p.add_assessment_providers(&caller, ids)?;
                if !added.is_empty() {
                    self.emit(
                        caller,
                        EntityRef::Project(project),
                        now,
                        WorkflowEvent::AssessmentProvidersAdded {
                            providers: added.clone(),
                        },
                    );
                }
                Ok(added)
            })
        })
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    fn remove_assessment_providers(
        &self,
        caller: Address,
        project: ProjectId,
        ids: &[Address],
    ) -> WorkflowResult<Vec<Address>> {
        self.guarded("remove_assessment_providers", caller, || {
            self.with_project(project, |p, now| {
                let outcome = p.remove_assessment_providers(&caller, ids, |unit_id| {
                    self.unit_handle(unit_id)
                        .map(|slot| slot.unit.lock().is_pending())
                        .unwrap_or(false)
                })?;

                for unit_id in &outcome.withdrawn {
                    if let Ok(slot) = self.unit_handle(*unit_id) {
                        slot.unit.lock().withdraw();
                    }
                }
                if !outcome.removed.is_empty() {
                    self.emit(
                        caller,
                        EntityRef::Project(project),
                        now,
                        WorkflowEvent::AssessmentProvidersRemoved {
                            providers: outcome.removed.clone(),
                            withdrawn_units: outcome.withdrawn.clone(),
                        },
                    );
                }
                self.emit_rounds(caller, project, now, outcome.completed_rounds);
                Ok(outcome.removed)
            })
        })
    }

    #[instrument(skip(self))]
    fn set_administrative_authority(
        &self,
        caller: Address,
        project: ProjectId,
        authority: Address,
    ) -> WorkflowResult<()> {
        self.guarded("set_administrative_authority", caller, || {
            self.with_project(project, |p, now| {
                p.set_administrative_authority(&caller, authority)?;
                self.emit(
                    caller,
                    EntityRef::Project(project),
                    now,
                    WorkflowEvent::AdministrativeAuthoritySet { authority },
                );
                Ok(())
            })
        })
    }

    #[instrument(skip(self))]
    fn remove_administrative_authority(
        &self,
        caller: Address,
        project: ProjectId,
    ) -> WorkflowResult<()> {
        self.guarded("remove_administrative_authority", caller, || {
            self.with_project(project, |p, now| {
                let previous = p.remove_administrative_authority(&caller)?;
                self.emit(
                    caller,
                    EntityRef::Project(project),
                    now,
                    WorkflowEvent::AdministrativeAuthorityRemoved { previous },
                );
                Ok(())
            })
        })
    }

    #[instrument(skip(self))]
    fn change_administrative_authority(
        &self,
        caller: Address,
        project: ProjectId,
        authority: Address,
    ) -> WorkflowResult<()> {
        self.guarded("change_administrative_authority", caller, || {
            self.with_project(project, |p, now| {
                let previous = p.change_administrative_authority(&caller, authority)?;
                self.emit(
                    caller,
                    EntityRef::Project(project),
                    now,
                    WorkflowEvent::AdministrativeAuthorityChanged {
                        previous,
                        authority,
                    },
                );
                Ok(())
            })
        })
    }

    #[instrument(skip(self, document))]
    fn set_dpp(&self, caller: Address, project: ProjectId, document: Document) -> WorkflowResult<()> {
        self.set_document("set_dpp", caller, project, DocumentType::Dpp, document)
    }

    #[instrument(skip(self, document))]
    fn set_dgd(&self, caller: Address, project: ProjectId, document: Document) -> WorkflowResult<()> {
        self.set_document("set_dgd", caller, project, DocumentType::Dgd, document)
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    fn send_dpp(
        &self,
        caller: Address,
        project: ProjectId,
        entries: Vec<DocumentSendRequest>,
    ) -> WorkflowResult<Vec<UnitId>> {
        self.send("send_dpp", caller, project, DocumentType::Dpp, entries)
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    fn send_dgd(
        &self,
        caller: Address,
        project: ProjectId,
        entries: Vec<DocumentSendRequest>,
    ) -> WorkflowResult<Vec<UnitId>> {
        self.send("send_dgd", caller, project, DocumentType::Dgd, entries)
    }

    #[instrument(skip(self, documents), fields(count = documents.len()))]
    fn add_attachments(
        &self,
        caller: Address,
        unit: UnitId,
        documents: Vec<Document>,
    ) -> WorkflowResult<()> {
        self.guarded("add_attachments", caller, || {
            self.with_unit(unit, |_, u, now| {
                let document_ids = u.add_attachments(&caller, documents)?;
                if !document_ids.is_empty() {
                    self.emit(
                        caller,
                        EntityRef::Unit(unit),
                        now,
                        WorkflowEvent::AttachmentsAdded { document_ids },
                    );
                }
                Ok(())
            })
        })
    }

    #[instrument(skip(self, ids))]
    fn remove_attachments(
        &self,
        caller: Address,
        unit: UnitId,
        ids: &[String],
    ) -> WorkflowResult<()> {
        self.guarded("remove_attachments", caller, || {
            self.with_unit(unit, |_, u, now| {
                let document_ids = u.remove_attachments(&caller, ids)?;
                if !document_ids.is_empty() {
                    self.emit(
                        caller,
                        EntityRef::Unit(unit),
                        now,
                        WorkflowEvent::AttachmentsRemoved { document_ids },
                    );
                }
                Ok(())
            })
        })
    }

    #[instrument(skip(self, document))]
    fn update_main_document(
        &self,
        caller: Address,
        unit: UnitId,
        document: Document,
    ) -> WorkflowResult<()> {
        self.guarded("update_main_document", caller, || {
            self.with_unit(unit, |_, u, now| {
                let document_id = document.id.clone();
                u.update_main_document(&caller, document)?;
                self.emit(
                    caller,
                    EntityRef::Unit(unit),
                    now,
                    WorkflowEvent::MainDocumentUpdated { document_id },
                );
                Ok(())
            })
        })
    }

    #[instrument(skip(self))]
    fn evaluate_assessment_due_date_extension(
        &self,
        caller: Address,
        unit: UnitId,
        accept: bool,
    ) -> WorkflowResult<()> {
        self.guarded("evaluate_assessment_due_date_extension", caller, || {
            self.with_unit(unit, |_, u, now| {
                let assessment_due_date = u.evaluate_assessment_due_date_extension(&caller, accept)?;
                self.emit(
                    caller,
                    EntityRef::Unit(unit),
                    now,
                    WorkflowEvent::AssessmentDueDateExtensionEvaluated {
                        accepted: accept,
                        assessment_due_date,
                    },
                );
                Ok(())
            })
        })
    }

    #[instrument(skip(self))]
    fn finalize_assessment(&self, caller: Address, unit: UnitId) -> WorkflowResult<()> {
        self.guarded("finalize_assessment", caller, || {
            self.with_unit(unit, |p, u, now| {
                match u.finalize_assessment(&caller, now)? {
                    FinalizeOutcome::Finalized => {
                        self.emit(
                            caller,
                            EntityRef::Unit(unit),
                            now,
                            WorkflowEvent::AssessmentFinalized,
                        );
                    }
                    FinalizeOutcome::DeadlineExceeded(completion) => {
                        self.emit(
                            caller,
                            EntityRef::Unit(unit),
                            now,
                            WorkflowEvent::DeadlineExceeded,
                        );
                        let rounds = p.record_completion(&completion);
                        self.emit_rounds(caller, p.id, now, rounds);
                    }
                }
                Ok(())
            })
        })
    }

    #[instrument(skip(self))]
    fn request_main_document_update(&self, caller: Address, unit: UnitId) -> WorkflowResult<()> {
        let policy = self.config.deadline_policy();
        self.guarded("request_main_document_update", caller, || {
            self.with_unit(unit, |_, u, now| {
                let assessment_due_date = u.request_main_document_update(&caller, &policy)?;
                self.emit(
                    caller,
                    EntityRef::Unit(unit),
                    now,
                    WorkflowEvent::MainDocumentUpdateRequested {
                        assessment_due_date,
                    },
                );
                Ok(())
            })
        })
    }

    #[instrument(skip(self))]
    fn request_assessment_due_date_extension(
        &self,
        caller: Address,
        unit: UnitId,
        requested: Timestamp,
    ) -> WorkflowResult<()> {
        let policy = self.config.deadline_policy();
        self.guarded("request_assessment_due_date_extension", caller, || {
            self.with_unit(unit, |_, u, now| {
                u.request_assessment_due_date_extension(&caller, requested, &policy)?;
                self.emit(
                    caller,
                    EntityRef::Unit(unit),
                    now,
                    WorkflowEvent::AssessmentDueDateExtensionRequested {
                        requested_due_date: requested,
                    },
                );
                Ok(())
            })
        })
    }

    #[instrument(skip(self, assessment))]
    fn provide_assessment(
        &self,
        caller: Address,
        unit: UnitId,
        assessment: Assessment,
        requires_further_assessment: bool,
    ) -> WorkflowResult<()> {
        self.guarded("provide_assessment", caller, || {
            self.with_unit(unit, |p, u, now| {
                let main_document_id = assessment.main_document.as_ref().map(|d| d.id.clone());
                let completion =
                    u.provide_assessment(&caller, assessment, requires_further_assessment, now)?;
                self.emit(
                    caller,
                    EntityRef::Unit(unit),
                    now,
                    WorkflowEvent::AssessmentProvided {
                        main_document_id,
                        requires_further_assessment,
                    },
                );
                let rounds = p.record_completion(&completion);
                self.emit_rounds(caller, p.id, now, rounds);
                Ok(())
            })
        })
    }

    #[instrument(skip(self, documents), fields(count = documents.len()))]
    fn add_assessment_attachments(
        &self,
        caller: Address,
        unit: UnitId,
        documents: Vec<Document>,
    ) -> WorkflowResult<()> {
        self.guarded("add_assessment_attachments", caller, || {
            self.with_unit(unit, |_, u, now| {
                let document_ids = u.add_assessment_attachments(&caller, documents)?;
                if !document_ids.is_empty() {
                    self.emit(
                        caller,
                        EntityRef::Unit(unit),
                        now,
                        WorkflowEvent::AssessmentAttachmentsAdded { document_ids },
                    );
                }
                Ok(())
            })
        })
    }

    #[instrument(skip(self, ids))]
    fn remove_assessment_attachments(
        &self,
        caller: Address,
        unit: UnitId,
        ids: &[String],
    ) -> WorkflowResult<()> {
        self.guarded("remove_assessment_attachments", caller, || {
            self.with_unit(unit, |_, u, now| {
                let document_ids = u.remove_assessment_attachments(&caller, ids)?;
                if !document_ids.is_empty() {
                    self.emit(
                        caller,
                        EntityRef::Unit(unit),
                        now,
                        WorkflowEvent::AssessmentAttachmentsRemoved { document_ids },
                    );
                }
                Ok(())
            })
        })
    }

    #[instrument(skip(self, document))]
    fn update_assessment_main_document(
        &self,
        caller: Address,
        unit: UnitId,
        document: Document,
    ) -> WorkflowResult<()> {
        self.guarded("update_assessment_main_document", caller, || {
            self.with_unit(unit, |_, u, now| {
                let document_id = document.id.clone();
                u.update_assessment_main_document(&caller, document)?;
                self.emit(
                    caller,
                    EntityRef::Unit(unit),
                    now,
                    WorkflowEvent::AssessmentMainDocumentUpdated { document_id },
                );
                Ok(())
            })
        })
    }

    fn project(&self, project: ProjectId) -> WorkflowResult<ProjectAggregate> {
        Ok(self.project_handle(project)?.lock().clone())
    }

    fn assessment_unit(&self, unit: UnitId) -> WorkflowResult<AssessmentUnit> {
        Ok(self.unit_handle(unit)?.unit.lock().clone())
    }
}
