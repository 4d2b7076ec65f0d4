//! Shared fixtures: a fully wired node running on a manual clock.

use std::sync::Arc;

use rc_01_access_control::AccessControlApi;
use rc_02_review_workflow::{
    DocumentSendRequest, ReviewWorkflowApi, ReviewWorkflowService,
};
use review_node::{NodeConfig, ServiceContainer};
use shared_bus::{EventEnvelope, Subscription};
use shared_types::{Address, Document, ManualTimeSource, ProjectId, Timestamp, UnitId};

/// Start of every scenario (2023-11-14T22:13:20Z).
pub const T0: Timestamp = 1_700_000_000;

pub struct Harness {
    pub node: ServiceContainer,
    pub clock: Arc<ManualTimeSource>,
    pub root: Address,
}

/// A project with its manager, reviewers and DPP units (in reviewer order).
pub struct SentRound {
    pub project: ProjectId,
    pub manager: Address,
    pub reviewers: Vec<Address>,
    pub units: Vec<UnitId>,
}

impl Harness {
    pub fn new() -> Self {
        let root = Address::from_label("root");
        let clock = Arc::new(ManualTimeSource::new(T0));
        let node = ServiceContainer::with_time(&NodeConfig::default(), root, clock.clone());
        Self { node, clock, root }
    }

    pub fn workflow(&self) -> &ReviewWorkflowService {
        &self.node.workflow
    }

    /// Creates an identity and registers it as an authorized caller.
    pub fn caller(&self, label: &str) -> Address {
        let id = Address::from_label(label);
        self.node
            .access_control
            .authorize_callers(self.root, &[id])
            .expect("root may authorize callers");
        id
    }

    pub fn reviewers(&self, n: usize) -> Vec<Address> {
        (0..n).map(|i| self.caller(&format!("reviewer-{i}"))).collect()
    }

    /// Creates a project, adds `n` reviewers, sets the DPP and sends it to all.
    pub fn sent_round(&self, n: usize) -> SentRound {
        let manager = self.caller("manager");
        let reviewers = self.reviewers(n);
        let wf = self.workflow();

        let project = wf.create_project(manager).expect("create project");
        wf.add_assessment_providers(manager, project, &reviewers)
            .expect("add reviewers");
        wf.set_dpp(manager, project, Document::labelled("ipfs://dpp-v1", manager))
            .expect("set DPP");
        let entries = reviewers.iter().map(|r| DocumentSendRequest::new(*r)).collect();
        let units = wf.send_dpp(manager, project, entries).expect("send DPP");

        SentRound {
            project,
            manager,
            reviewers,
            units,
        }
    }
}

/// Collects everything currently queued on a subscription.
pub fn drain(sub: &mut Subscription) -> Vec<EventEnvelope> {
    let mut out = Vec::new();
    while let Ok(Some(envelope)) = sub.try_recv() {
        out.push(envelope);
    }
    out
}

pub fn names(envelopes: &[EventEnvelope]) -> Vec<&'static str> {
    envelopes.iter().map(|e| e.event.name()).collect()
}
