//! # Workflow Events
//!
//! Every committed state transition produces exactly one [`WorkflowEvent`],
//! wrapped in an [`EventEnvelope`] that names the entity it happened to.

use serde::{Deserialize, Serialize};
use shared_types::{Address, DocumentType, ProjectId, Timestamp, UnitId};
use std::fmt;

/// The entity an event belongs to. Ordering is guaranteed per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    /// The access-control registry (a singleton).
    Registry,
    Project(ProjectId),
    Unit(UnitId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry => write!(f, "registry"),
            Self::Project(id) => write!(f, "{id}"),
            Self::Unit(id) => write!(f, "{id}"),
        }
    }
}

/// All events that can be published to the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowEvent {
    // =========================================================================
    // ACCESS CONTROL
    // =========================================================================
    OwnersAdded { ids: Vec<Address> },
    OwnersRemoved { ids: Vec<Address> },
    CallersAuthorized { ids: Vec<Address> },
    CallersUnauthorized { ids: Vec<Address> },

    // =========================================================================
    // PROJECT
    // =========================================================================
    ProjectCreated { manager: Address },
    AssessmentProvidersAdded { providers: Vec<Address> },
    /// Providers removed, with the pending units that were withdrawn.
    AssessmentProvidersRemoved {
        providers: Vec<Address>,
        withdrawn_units: Vec<UnitId>,
    },
    AdministrativeAuthoritySet { authority: Address },
    AdministrativeAuthorityRemoved { previous: Option<Address> },
    AdministrativeAuthorityChanged { previous: Address, authority: Address },
    /// The project's DPP or DGD was replaced.
    DocumentSet {
        document_type: DocumentType,
        document_id: String,
    },
    /// A round was disseminated to reviewers.
    DocumentSent {
        document_type: DocumentType,
        units: Vec<(Address, UnitId)>,
    },
    /// Every current provider has finished the round.
    RoundAssessed { document_type: DocumentType },

    // =========================================================================
    // ASSESSMENT UNIT
    // =========================================================================
    AssessmentUnitCreated {
        project: ProjectId,
        assessment_provider: Address,
        document_type: DocumentType,
        assessment_due_date: Timestamp,
    },
    AttachmentsAdded { document_ids: Vec<String> },
    AttachmentsRemoved { document_ids: Vec<String> },
    MainDocumentUpdated { document_id: String },
    MainDocumentUpdateRequested { assessment_due_date: Timestamp },
    AssessmentDueDateExtensionRequested { requested_due_date: Timestamp },
    AssessmentDueDateExtensionEvaluated {
        accepted: bool,
        assessment_due_date: Timestamp,
    },
    AssessmentProvided {
        main_document_id: Option<String>,
        requires_further_assessment: bool,
    },
    AssessmentAttachmentsAdded { document_ids: Vec<String> },
    AssessmentAttachmentsRemoved { document_ids: Vec<String> },
    AssessmentMainDocumentUpdated { document_id: String },
    AssessmentFinalized,
    /// Finalized without an assessment (tacit consent).
    DeadlineExceeded,
}

impl WorkflowEvent {
    /// Stable name used by the audit trail.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::OwnersAdded { .. } => "OwnersAdded",
            Self::OwnersRemoved { .. } => "OwnersRemoved",
            Self::CallersAuthorized { .. } => "CallersAuthorized",
            Self::CallersUnauthorized { .. } => "CallersUnauthorized",
            Self::ProjectCreated { .. } => "ProjectCreated",
            Self::AssessmentProvidersAdded { .. } => "AssessmentProvidersAdded",
            Self::AssessmentProvidersRemoved { .. } => "AssessmentProvidersRemoved",
            Self::AdministrativeAuthoritySet { .. } => "AdministrativeAuthoritySet",
            Self::AdministrativeAuthorityRemoved { .. } => "AdministrativeAuthorityRemoved",
            Self::AdministrativeAuthorityChanged { .. } => "AdministrativeAuthorityChanged",
            Self::DocumentSet { document_type, .. } => match document_type {
                DocumentType::Dpp => "DppSet",
                DocumentType::Dgd => "DgdSet",
            },
            Self::DocumentSent { document_type, .. } => match document_type {
                DocumentType::Dpp => "DppSent",
                DocumentType::Dgd => "DgdSent",
            },
            Self::RoundAssessed { document_type } => match document_type {
                DocumentType::Dpp => "AllDppsAssessed",
                DocumentType::Dgd => "AllDgdsAssessed",
            },
            Self::AssessmentUnitCreated { .. } => "AssessmentUnitCreated",
            Self::AttachmentsAdded { .. } => "AttachmentsAdded",
            Self::AttachmentsRemoved { .. } => "AttachmentsRemoved",
            Self::MainDocumentUpdated { .. } => "MainDocumentUpdated",
            Self::MainDocumentUpdateRequested { .. } => "MainDocumentUpdateRequested",
            Self::AssessmentDueDateExtensionRequested { .. } => {
                "AssessmentDueDateExtensionRequested"
            }
            Self::AssessmentDueDateExtensionEvaluated { .. } => {
                "AssessmentDueDateExtensionEvaluated"
            }
            Self::AssessmentProvided { .. } => "AssessmentProvided",
            Self::AssessmentAttachmentsAdded { .. } => "AssessmentAttachmentsAdded",
            Self::AssessmentAttachmentsRemoved { .. } => "AssessmentAttachmentsRemoved",
            Self::AssessmentMainDocumentUpdated { .. } => "AssessmentMainDocumentUpdated",
            Self::AssessmentFinalized => "AssessmentFinalized",
            Self::DeadlineExceeded => "DeadlineExceeded",
        }
    }

    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::OwnersAdded { .. }
            | Self::OwnersRemoved { .. }
            | Self::CallersAuthorized { .. }
            | Self::CallersUnauthorized { .. } => EventTopic::AccessControl,
            Self::ProjectCreated { .. }
            | Self::AssessmentProvidersAdded { .. }
            | Self::AssessmentProvidersRemoved { .. }
            | Self::AdministrativeAuthoritySet { .. }
            | Self::AdministrativeAuthorityRemoved { .. }
            | Self::AdministrativeAuthorityChanged { .. }
            | Self::DocumentSet { .. }
            | Self::DocumentSent { .. }
            | Self::RoundAssessed { .. } => EventTopic::Project,
            _ => EventTopic::AssessmentUnit,
        }
    }
}

/// A published event together with its ordering metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Bus-wide, strictly increasing publish sequence.
    pub sequence: u64,
    pub entity: EntityRef,
    /// Commit time of the transition.
    pub occurred_at: Timestamp,
    pub event: WorkflowEvent,
}

impl EventEnvelope {
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        self.event.topic()
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    AccessControl,
    Project,
    AssessmentUnit,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&envelope.topic())
    }
}
