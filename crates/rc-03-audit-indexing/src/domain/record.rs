//! # Audit Record
//!
//! One row per bus envelope. Rows are append-only and identified by
//! [`AuditKey`].

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use shared_bus::{EventEnvelope, WorkflowEvent};
use shared_types::{Address, Timestamp};

/// A persisted workflow transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_name: String,
    /// `registry`, `project:<uuid>` or `unit:<uuid>`.
    pub entity_id: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// Bus sequence of the originating envelope.
    pub sequence: u64,
}

/// Deduplication key. Redelivering an envelope yields the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuditKey {
    pub event_name: String,
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
}

impl AuditRecord {
    #[must_use]
    pub fn from_envelope(envelope: &EventEnvelope) -> Self {
        Self {
            event_name: envelope.event.name().to_string(),
            entity_id: envelope.entity.to_string(),
            description: describe(&envelope.event),
            timestamp: to_datetime(envelope.occurred_at),
            sequence: envelope.sequence,
        }
    }

    #[must_use]
    pub fn key(&self) -> AuditKey {
        AuditKey {
            event_name: self.event_name.clone(),
            entity_id: self.entity_id.clone(),
            timestamp: self.timestamp,
            sequence: self.sequence,
        }
    }
}

/// Converts workflow seconds to a UTC instant. Out-of-range values clamp to
/// the epoch.
#[must_use]
pub fn to_datetime(ts: Timestamp) -> DateTime<Utc> {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_default()
}

fn date(ts: Timestamp) -> String {
    to_datetime(ts).format("%Y-%m-%d").to_string()
}

fn addresses(ids: &[Address]) -> String {
    ids.iter()
        .map(Address::to_hex)
        .collect::<Vec<_>>()
        .join(", ")
}

fn documents(ids: &[String]) -> String {
    ids.join(", ")
}

/// Human-readable sentence for an event.
#[must_use]
pub fn describe(event: &WorkflowEvent) -> String {
    use WorkflowEvent as E;

    match event {
        E::OwnersAdded { ids } => format!("Registry owners added: {}", addresses(ids)),
        E::OwnersRemoved { ids } => format!("Registry owners removed: {}", addresses(ids)),
        E::CallersAuthorized { ids } => format!("Callers authorized: {}", addresses(ids)),
        E::CallersUnauthorized { ids } => format!("Callers unauthorized: {}", addresses(ids)),

        E::ProjectCreated { manager } => {
            format!("Project created by manager {}", manager.to_hex())
        }
        E::AssessmentProvidersAdded { providers } => {
            format!("Assessment providers {} added to the project", addresses(providers))
        }
        E::AssessmentProvidersRemoved {
            providers,
            withdrawn_units,
        } => {
            let mut s = format!(
                "Assessment providers {} removed from the project",
                addresses(providers)
            );
            if !withdrawn_units.is_empty() {
                s.push_str(&format!(
                    "; {} pending assessment unit(s) withdrawn",
                    withdrawn_units.len()
                ));
            }
            s
        }
        E::AdministrativeAuthoritySet { authority } => {
            format!("Administrative authority {} set", authority.to_hex())
        }
        E::AdministrativeAuthorityRemoved { previous } => match previous {
            Some(previous) => format!("Administrative authority {} removed", previous.to_hex()),
            None => "Administrative authority removed".to_string(),
        },
        E::AdministrativeAuthorityChanged {
            previous,
            authority,
        } => format!(
            "Administrative authority changed from {} to {}",
            previous.to_hex(),
            authority.to_hex()
        ),
        E::DocumentSet {
            document_type,
            document_id,
        } => format!("{document_type} {document_id} set on the project"),
        E::DocumentSent {
            document_type,
            units,
        } => {
            let providers: Vec<Address> = units.iter().map(|(p, _)| *p).collect();
            format!(
                "{document_type} sent to assessment providers {}",
                addresses(&providers)
            )
        }
        E::RoundAssessed { document_type } => {
            format!("All {document_type}s have been assessed")
        }

        E::AssessmentUnitCreated {
            assessment_provider,
            document_type,
            assessment_due_date,
            ..
        } => format!(
            "Assessment unit for {document_type} created for {} with due date {}",
            assessment_provider.to_hex(),
            date(*assessment_due_date)
        ),
        E::AttachmentsAdded { document_ids } => {
            format!("Attachments {} added", documents(document_ids))
        }
        E::AttachmentsRemoved { document_ids } => {
            format!("Attachments {} removed", documents(document_ids))
        }
        E::MainDocumentUpdated { document_id } => {
            format!("Main document replaced with {document_id}")
        }
        E::MainDocumentUpdateRequested {
            assessment_due_date,
        } => format!(
            "Main document update requested; due date moved to {}",
            date(*assessment_due_date)
        ),
        E::AssessmentDueDateExtensionRequested { requested_due_date } => format!(
            "Due date extension to {} requested",
            date(*requested_due_date)
        ),
        E::AssessmentDueDateExtensionEvaluated {
            accepted,
            assessment_due_date,
        } => format!(
            "Due date extension {}; due date is {}",
            if *accepted { "accepted" } else { "rejected" },
            date(*assessment_due_date)
        ),
        E::AssessmentProvided {
            main_document_id,
            requires_further_assessment,
        } => {
            let mut s = match main_document_id {
                Some(id) => format!("Assessment provided with document {id}"),
                None => "Assessment provided".to_string(),
            };
            if *requires_further_assessment {
                s.push_str("; further assessment required");
            }
            s
        }
        E::AssessmentAttachmentsAdded { document_ids } => {
            format!("Assessment attachments {} added", documents(document_ids))
        }
        E::AssessmentAttachmentsRemoved { document_ids } => {
            format!("Assessment attachments {} removed", documents(document_ids))
        }
        E::AssessmentMainDocumentUpdated { document_id } => {
            format!("Assessment main document replaced with {document_id}")
        }
        E::AssessmentFinalized => "Assessment finalized".to_string(),
        E::DeadlineExceeded => {
            "Assessment deadline passed without an assessment; tacit consent recorded".to_string()
        }
    }
}
