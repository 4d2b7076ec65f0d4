//! # Project Aggregate
//!
//! Tracks reviewer membership, the two document rounds (DPP then DGD) and
//! completion accounting. Units are referenced by id only; anything that
//! needs unit state is handed in by the caller.

use super::assessment_unit::{AssessmentUnit, Completion};
use super::attachments::AttachmentList;
use serde::{Deserialize, Serialize};
use shared_types::{
    Address, Document, DocumentType, ProjectId, Role, Timestamp, UnitId, WorkflowError,
    WorkflowResult,
};
use std::collections::{HashMap, HashSet};

/// A reviewer's membership record on one project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentProviderEntry {
    /// `false` once the reviewer was removed.
    pub exists: bool,
    pub has_received_dpp: bool,
    pub has_assessed_dpp: bool,
    pub has_received_dgd: bool,
    pub has_assessed_dgd: bool,
    pub dpp_unit: Option<UnitId>,
    pub dgd_unit: Option<UnitId>,
}

impl AssessmentProviderEntry {
    #[must_use]
    pub fn has_received(&self, document_type: DocumentType) -> bool {
        match document_type {
            DocumentType::Dpp => self.has_received_dpp,
            DocumentType::Dgd => self.has_received_dgd,
        }
    }

    #[must_use]
    pub fn has_assessed(&self, document_type: DocumentType) -> bool {
        match document_type {
            DocumentType::Dpp => self.has_assessed_dpp,
            DocumentType::Dgd => self.has_assessed_dgd,
        }
    }

    #[must_use]
    pub fn unit(&self, document_type: DocumentType) -> Option<UnitId> {
        match document_type {
            DocumentType::Dpp => self.dpp_unit,
            DocumentType::Dgd => self.dgd_unit,
        }
    }

    fn record_sent(&mut self, document_type: DocumentType, unit: UnitId) {
        match document_type {
            DocumentType::Dpp => {
                self.has_received_dpp = true;
                self.dpp_unit = Some(unit);
            }
            DocumentType::Dgd => {
                self.has_received_dgd = true;
                self.dgd_unit = Some(unit);
            }
        }
    }

    fn clear_sent(&mut self, document_type: DocumentType) {
        match document_type {
            DocumentType::Dpp => {
                self.has_received_dpp = false;
                self.dpp_unit = None;
            }
            DocumentType::Dgd => {
                self.has_received_dgd = false;
                self.dgd_unit = None;
            }
        }
    }

    /// Sets the assessed flag; returns whether it flipped.
    fn mark_assessed(&mut self, document_type: DocumentType) -> bool {
        let flag = match document_type {
            DocumentType::Dpp => &mut self.has_assessed_dpp,
            DocumentType::Dgd => &mut self.has_assessed_dgd,
        };
        !std::mem::replace(flag, true)
    }
}

/// One dissemination entry for `send_dpp` / `send_dgd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSendRequest {
    pub assessment_provider: Address,
    pub attachments: Vec<Document>,
    /// Defaults to `now + assessment period` when absent.
    pub assessment_due_date: Option<Timestamp>,
}

impl DocumentSendRequest {
    #[must_use]
    pub fn new(assessment_provider: Address) -> Self {
        Self {
            assessment_provider,
            attachments: Vec::new(),
            assessment_due_date: None,
        }
    }

    #[must_use]
    pub fn with_due_date(mut self, due: Timestamp) -> Self {
        self.assessment_due_date = Some(due);
        self
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Document>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// Outcome of removing reviewers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderRemoval {
    pub removed: Vec<Address>,
    /// Pending units dropped from the sent lists; the caller must close them.
    pub withdrawn: Vec<UnitId>,
    /// Rounds that became fully assessed because the provider count shrank.
    pub completed_rounds: Vec<DocumentType>,
}

/// The project aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAggregate {
    pub id: ProjectId,
    pub manager: Address,
    pub administrative_authority: Option<Address>,
    pub dpp: Option<Document>,
    pub dgd: Option<Document>,
    providers: HashMap<Address, AssessmentProviderEntry>,
    pub sent_dpps: Vec<UnitId>,
    pub sent_dgds: Vec<UnitId>,
    pub num_assessment_providers: u64,
    pub num_assessed_dpps: u64,
    pub num_assessed_dgds: u64,
    pub all_dpps_assessed: bool,
    pub all_dgds_assessed: bool,
    /// Set once every DGD is assessed; project mutators are rejected afterwards.
    pub closed: bool,
    pub date_created: Timestamp,
}

impl ProjectAggregate {
    #[must_use]
    pub fn new(id: ProjectId, manager: Address, now: Timestamp) -> Self {
        Self {
            id,
            manager,
            administrative_authority: None,
            dpp: None,
            dgd: None,
            providers: HashMap::new(),
            sent_dpps: Vec::new(),
            sent_dgds: Vec::new(),
            num_assessment_providers: 0,
            num_assessed_dpps: 0,
            num_assessed_dgds: 0,
            all_dpps_assessed: false,
            all_dgds_assessed: false,
            closed: false,
            date_created: now,
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[must_use]
    pub fn assessment_provider(&self, id: &Address) -> Option<&AssessmentProviderEntry> {
        self.providers.get(id)
    }

    /// Current (non-removed) providers in ascending byte order.
    #[must_use]
    pub fn assessment_providers(&self) -> Vec<Address> {
        let mut out: Vec<Address> = self
            .providers
            .iter()
            .filter(|(_, e)| e.exists)
            .map(|(a, _)| *a)
            .collect();
        out.sort();
        out
    }

    #[must_use]
    pub fn document(&self, document_type: DocumentType) -> Option<&Document> {
        match document_type {
            DocumentType::Dpp => self.dpp.as_ref(),
            DocumentType::Dgd => self.dgd.as_ref(),
        }
    }

    #[must_use]
    pub fn sent(&self, document_type: DocumentType) -> &[UnitId] {
        match document_type {
            DocumentType::Dpp => &self.sent_dpps,
            DocumentType::Dgd => &self.sent_dgds,
        }
    }

    #[must_use]
    pub fn num_assessed(&self, document_type: DocumentType) -> u64 {
        match document_type {
            DocumentType::Dpp => self.num_assessed_dpps,
            DocumentType::Dgd => self.num_assessed_dgds,
        }
    }

    // =========================================================================
    // GUARDS
    // =========================================================================

    fn require_manager(&self, caller: &Address) -> WorkflowResult<()> {
        if *caller == self.manager {
            Ok(())
        } else {
            Err(WorkflowError::unauthorized(*caller, Role::ProjectManager))
        }
    }

    fn require_open(&self) -> WorkflowResult<()> {
        if self.closed {
            Err(WorkflowError::invalid_state("project is closed"))
        } else {
            Ok(())
        }
    }

    /// Whether every current provider has finished `document_type`.
    ///
    /// Counters keep assessments of removed reviewers, so completion is
    /// decided on current membership only.
    fn round_complete(&self, document_type: DocumentType) -> bool {
        self.num_assessment_providers > 0
            && self
                .providers
                .values()
                .filter(|e| e.exists)
                .all(|e| e.has_assessed(document_type))
    }

    fn require_membership_mutable(&self) -> WorkflowResult<()> {
        if self.round_complete(DocumentType::Dpp) {
            return Err(WorkflowError::invalid_state(
                "all DPPs have been assessed; assessment providers can no longer change",
            ));
        }
        Ok(())
    }

    fn require_mutable_by(&self, caller: &Address) -> WorkflowResult<()> {
        self.require_manager(caller)?;
        self.require_open()
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Returns the providers that joined (or re-joined).
    pub fn add_assessment_providers(
        &mut self,
        caller: &Address,
        ids: &[Address],
    ) -> WorkflowResult<Vec<Address>> {
        self.require_mutable_by(caller)?;
        self.require_membership_mutable()?;

        let mut added = Vec::new();
        for id in ids {
            let entry = self
                .providers
                .entry(*id)
                .or_insert_with(AssessmentProviderEntry::default);
            if !entry.exists {
                // A returning reviewer keeps its earlier flags.
                entry.exists = true;
                self.num_assessment_providers += 1;
                added.push(*id);
            }
        }
        Ok(added)
    }

    /// Removes providers and drops their pending sends.
    ///
    /// `is_pending` reports whether a unit is still awaiting its assessment.
    /// Already-assessed units and the counts they contributed are kept.
    pub fn remove_assessment_providers<F>(
        &mut self,
        caller: &Address,
        ids: &[Address],
        is_pending: F,
    ) -> WorkflowResult<ProviderRemoval>
    where
        F: Fn(UnitId) -> bool,
    {
        self.require_mutable_by(caller)?;
        self.require_membership_mutable()?;

        let mut outcome = ProviderRemoval::default();
        for id in ids {
            let Some(entry) = self.providers.get_mut(id) else {
                continue;
            };
            if !entry.exists {
                continue;
            }
            entry.exists = false;
            self.num_assessment_providers -= 1;
            outcome.removed.push(*id);

            for document_type in [DocumentType::Dpp, DocumentType::Dgd] {
                if let Some(unit) = entry.unit(document_type) {
                    if is_pending(unit) {
                        entry.clear_sent(document_type);
                        outcome.withdrawn.push(unit);
                    }
                }
            }
        }

        let withdrawn: HashSet<UnitId> = outcome.withdrawn.iter().copied().collect();
        self.sent_dpps.retain(|u| !withdrawn.contains(u));
        self.sent_dgds.retain(|u| !withdrawn.contains(u));
        outcome.completed_rounds = self.check_round_milestones();
        Ok(outcome)
    }

    // =========================================================================
    // ADMINISTRATIVE AUTHORITY
    // =========================================================================

    pub fn set_administrative_authority(
        &mut self,
        caller: &Address,
        authority: Address,
    ) -> WorkflowResult<()> {
        self.require_mutable_by(caller)?;
        if self.administrative_authority.is_some() {
            return Err(WorkflowError::invalid_state(
                "administrative authority has already been set",
            ));
        }
        self.administrative_authority = Some(authority);
        Ok(())
    }

    /// Returns the previous authority, if any.
    pub fn remove_administrative_authority(
        &mut self,
        caller: &Address,
    ) -> WorkflowResult<Option<Address>> {
        self.require_mutable_by(caller)?;
        Ok(self.administrative_authority.take())
    }

    /// Returns the previous authority.
    pub fn change_administrative_authority(
        &mut self,
        caller: &Address,
        authority: Address,
    ) -> WorkflowResult<Address> {
        self.require_mutable_by(caller)?;
        let Some(previous) = self.administrative_authority else {
            return Err(WorkflowError::invalid_state(
                "administrative authority has not been set",
            ));
        };
        self.administrative_authority = Some(authority);
        Ok(previous)
    }

    // =========================================================================
    // DOCUMENTS
    // =========================================================================

    /// Replaces the round's document. Returns the units already sent for that
    /// round so their update flags can be cleared.
    pub fn set_document(
        &mut self,
        caller: &Address,
        document_type: DocumentType,
        document: Document,
    ) -> WorkflowResult<Vec<UnitId>> {
        self.require_mutable_by(caller)?;
        match document_type {
            DocumentType::Dpp => self.dpp = Some(document),
            DocumentType::Dgd => self.dgd = Some(document),
        }
        Ok(self.sent(document_type).to_vec())
    }

    /// Validates the whole batch, then creates one unit per entry.
    pub fn send_documents(
        &mut self,
        caller: &Address,
        document_type: DocumentType,
        entries: Vec<DocumentSendRequest>,
        now: Timestamp,
        default_period: u64,
    ) -> WorkflowResult<Vec<AssessmentUnit>> {
        self.require_mutable_by(caller)?;
        let Some(document) = self.document(document_type).cloned() else {
            return Err(WorkflowError::invalid_state(format!(
                "{document_type} has not been set"
            )));
        };

        let mut seen = HashSet::new();
        let mut planned = Vec::with_capacity(entries.len());
        for entry in entries {
            let provider = entry.assessment_provider;
            let record = self
                .providers
                .get(&provider)
                .filter(|e| e.exists)
                .ok_or_else(|| WorkflowError::not_found("assessment provider", provider))?;

            if !seen.insert(provider) || record.has_received(document_type) {
                return Err(WorkflowError::already_exists(
                    "assessment unit",
                    format!("{document_type} for {provider}"),
                ));
            }
            if document_type == DocumentType::Dgd && record.has_assessed_dgd {
                return Err(WorkflowError::already_exists(
                    "assessment",
                    format!("{document_type} for {provider}"),
                ));
            }

            let due = entry
                .assessment_due_date
                .unwrap_or_else(|| now.saturating_add(default_period));
            if due <= now {
                return Err(WorkflowError::invalid_argument(format!(
                    "assessment due date {due} is not in the future"
                )));
            }
            let attachments = AttachmentList::validated(entry.attachments, None)?;
            planned.push((provider, attachments, due));
        }

        let mut units = Vec::with_capacity(planned.len());
        for (provider, attachments, due) in planned {
            let unit = AssessmentUnit::new(
                UnitId::new(),
                self.id,
                self.manager,
                provider,
                document.clone(),
                document_type,
                attachments.into_vec(),
                now,
                due,
            );
            if let Some(record) = self.providers.get_mut(&provider) {
                record.record_sent(document_type, unit.id);
            }
            match document_type {
                DocumentType::Dpp => self.sent_dpps.push(unit.id),
                DocumentType::Dgd => self.sent_dgds.push(unit.id),
            }
            units.push(unit);
        }
        Ok(units)
    }

    // =========================================================================
    // COMPLETION ACCOUNTING
    // =========================================================================

    /// Applies a finished assessment. Returns rounds that just completed.
    ///
    /// A DPP assessed without need for further assessment also credits the
    /// reviewer's DGD, since no DGD will be sent to them.
    pub fn record_completion(&mut self, completion: &Completion) -> Vec<DocumentType> {
        let Some(entry) = self.providers.get_mut(&completion.assessment_provider) else {
            return Vec::new();
        };

        if entry.mark_assessed(completion.document_type) {
            match completion.document_type {
                DocumentType::Dpp => self.num_assessed_dpps += 1,
                DocumentType::Dgd => self.num_assessed_dgds += 1,
            }
        }
        if completion.document_type == DocumentType::Dpp
            && !completion.requires_further_assessment
            && entry.mark_assessed(DocumentType::Dgd)
        {
            self.num_assessed_dgds += 1;
        }

        self.check_round_milestones()
    }

    fn check_round_milestones(&mut self) -> Vec<DocumentType> {
        let mut completed = Vec::new();
        if !self.all_dpps_assessed && self.round_complete(DocumentType::Dpp) {
            self.all_dpps_assessed = true;
            completed.push(DocumentType::Dpp);
        }
        if self.all_dpps_assessed
            && !self.all_dgds_assessed
            && self.round_complete(DocumentType::Dgd)
        {
            self.all_dgds_assessed = true;
            self.closed = true;
            completed.push(DocumentType::Dgd);
        }
        completed
    }
}
