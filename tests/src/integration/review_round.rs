//! # Review Round Scenarios
//!
//! Registry and workflow together: authorization gating, the DPP and DGD
//! rounds, reviewer removal and deadline handling.

#[cfg(test)]
mod tests {
    use crate::fixtures::{drain, names, Harness, T0};
    use rc_01_access_control::AccessControlApi;
    use rc_02_review_workflow::{Assessment, DocumentSendRequest, ReviewWorkflowApi, UnitState};
    use shared_bus::{EntityRef, EventFilter, EventTopic, WorkflowEvent};
    use shared_types::{days, Address, Document, DocumentType, Role, WorkflowError};

    // =========================================================================
    // ROUNDS
    // =========================================================================

    #[test]
    fn test_full_round_without_further_assessment_closes_project() {
        let h = Harness::new();
        let round = h.sent_round(3);
        let mut sub = h
            .node
            .event_bus
            .subscribe(EventFilter::topics(vec![EventTopic::Project]));

        for (reviewer, unit) in round.reviewers.iter().zip(&round.units) {
            h.workflow()
                .provide_assessment(*reviewer, *unit, Assessment::default(), false)
                .unwrap();
        }

        let project = h.workflow().project(round.project).unwrap();
        assert_eq!(project.num_assessed_dpps, 3);
        assert_eq!(project.num_assessment_providers, 3);
        // No further assessment means no DGD round is owed.
        assert_eq!(project.num_assessed_dgds, 3);
        assert!(project.all_dpps_assessed);
        assert!(project.closed);

        assert_eq!(
            names(&drain(&mut sub)),
            vec!["AllDppsAssessed", "AllDgdsAssessed"]
        );

        let err = h
            .workflow()
            .set_dgd(round.manager, round.project, Document::labelled("dgd", round.manager))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState(_)));
    }

    #[test]
    fn test_two_round_flow() {
        let h = Harness::new();
        let round = h.sent_round(2);
        let wf = h.workflow();

        for (reviewer, unit) in round.reviewers.iter().zip(&round.units) {
            wf.provide_assessment(*reviewer, *unit, Assessment::default(), true)
                .unwrap();
        }
        let project = wf.project(round.project).unwrap();
        assert!(project.all_dpps_assessed);
        assert!(!project.closed);

        wf.set_dgd(round.manager, round.project, Document::labelled("ipfs://dgd", round.manager))
            .unwrap();
        let entries = round
            .reviewers
            .iter()
            .map(|r| DocumentSendRequest::new(*r).with_due_date(T0 + days(20)))
            .collect();
        let dgd_units = wf.send_dgd(round.manager, round.project, entries).unwrap();
        assert_eq!(dgd_units.len(), 2);

        let unit = wf.assessment_unit(dgd_units[0]).unwrap();
        assert_eq!(unit.main_document_type, DocumentType::Dgd);
        assert_eq!(unit.main_document.id, "ipfs://dgd");
        assert_eq!(unit.assessment_due_date, T0 + days(20));

        for (reviewer, unit) in round.reviewers.iter().zip(&dgd_units) {
            wf.provide_assessment(*reviewer, *unit, Assessment::default(), false)
                .unwrap();
        }
        let project = wf.project(round.project).unwrap();
        assert_eq!(project.num_assessed_dgds, 2);
        assert!(project.all_dgds_assessed);
        assert!(project.closed);
    }

    #[test]
    fn test_membership_frozen_after_dpp_round() {
        let h = Harness::new();
        let round = h.sent_round(1);
        h.workflow()
            .provide_assessment(round.reviewers[0], round.units[0], Assessment::default(), true)
            .unwrap();

        let late = h.caller("late-reviewer");
        let err = h
            .workflow()
            .add_assessment_providers(round.manager, round.project, &[late])
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState(_)));
    }

    // =========================================================================
    // SENDING
    // =========================================================================

    #[test]
    fn test_send_before_set_and_send_twice() {
        let h = Harness::new();
        let manager = h.caller("manager");
        let reviewer = h.caller("reviewer");
        let wf = h.workflow();
        let project = wf.create_project(manager).unwrap();
        wf.add_assessment_providers(manager, project, &[reviewer])
            .unwrap();

        let err = wf
            .send_dpp(manager, project, vec![DocumentSendRequest::new(reviewer)])
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState(_)));

        wf.set_dpp(manager, project, Document::labelled("dpp", manager))
            .unwrap();
        wf.send_dpp(manager, project, vec![DocumentSendRequest::new(reviewer)])
            .unwrap();
        let err = wf
            .send_dpp(manager, project, vec![DocumentSendRequest::new(reviewer)])
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyExists { .. }));
        assert_eq!(wf.project(project).unwrap().sent_dpps.len(), 1);
    }

    #[test]
    fn test_invalid_batch_creates_nothing() {
        let h = Harness::new();
        let manager = h.caller("manager");
        let reviewers = h.reviewers(2);
        let stranger = Address::from_label("not-a-reviewer");
        let wf = h.workflow();
        let project = wf.create_project(manager).unwrap();
        wf.add_assessment_providers(manager, project, &reviewers)
            .unwrap();
        wf.set_dpp(manager, project, Document::labelled("dpp", manager))
            .unwrap();

        let err = wf
            .send_dpp(
                manager,
                project,
                vec![
                    DocumentSendRequest::new(reviewers[0]),
                    DocumentSendRequest::new(stranger),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));

        let err = wf
            .send_dpp(
                manager,
                project,
                vec![DocumentSendRequest::new(reviewers[1]).with_due_date(T0)],
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidArgument(_)));

        let snapshot = wf.project(project).unwrap();
        assert!(snapshot.sent_dpps.is_empty());
        assert!(!snapshot
            .assessment_provider(&reviewers[0])
            .unwrap()
            .has_received_dpp);
    }

    #[test]
    fn test_removing_reviewers_after_send() {
        let h = Harness::new();
        let round = h.sent_round(3);
        let mut sub = h.node.event_bus.subscribe(EventFilter::all());

        let removed = h
            .workflow()
            .remove_assessment_providers(round.manager, round.project, &round.reviewers[1..])
            .unwrap();
        assert_eq!(removed.len(), 2);

        let project = h.workflow().project(round.project).unwrap();
        assert_eq!(project.sent_dpps, vec![round.units[0]]);
        assert_eq!(project.num_assessment_providers, 1);
        assert_eq!(
            project.assessment_providers(),
            vec![round.reviewers[0]]
        );

        for unit in &round.units[1..] {
            let snapshot = h.workflow().assessment_unit(*unit).unwrap();
            assert!(snapshot.withdrawn);
            assert!(snapshot.closed);
        }

        let events = drain(&mut sub);
        assert_eq!(events.len(), 1);
        match &events[0].event {
            WorkflowEvent::AssessmentProvidersRemoved {
                providers,
                withdrawn_units,
            } => {
                assert_eq!(providers, &round.reviewers[1..].to_vec());
                assert_eq!(withdrawn_units, &round.units[1..].to_vec());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_removing_last_pending_reviewer_completes_round() {
        let h = Harness::new();
        let round = h.sent_round(2);
        let wf = h.workflow();

        wf.provide_assessment(round.reviewers[0], round.units[0], Assessment::default(), true)
            .unwrap();
        wf.remove_assessment_providers(round.manager, round.project, &[round.reviewers[1]])
            .unwrap();

        let project = wf.project(round.project).unwrap();
        assert_eq!(project.num_assessment_providers, 1);
        assert!(project.all_dpps_assessed);
    }

    // =========================================================================
    // AUTHORIZATION
    // =========================================================================

    #[test]
    fn test_registry_rejects_non_owner() {
        let h = Harness::new();
        let mallory = Address::from_label("mallory");

        let err = h
            .node
            .access_control
            .add_owners(mallory, &[mallory])
            .unwrap_err();
        assert_eq!(err, WorkflowError::unauthorized(mallory, Role::Owner));
        assert!(!h.node.access_control.is_owner(&mallory));
    }

    #[test]
    fn test_unauthorizing_manager_blocks_workflow() {
        let h = Harness::new();
        let round = h.sent_round(1);

        h.node
            .access_control
            .unauthorize_callers(h.root, &[round.manager])
            .unwrap();
        let err = h
            .workflow()
            .set_administrative_authority(round.manager, round.project, Address::from_label("aa"))
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::unauthorized(round.manager, Role::AuthorizedCaller)
        );
        assert!(h
            .workflow()
            .project(round.project)
            .unwrap()
            .administrative_authority
            .is_none());
    }

    #[test]
    fn test_roles_checked_after_authorization() {
        let h = Harness::new();
        let round = h.sent_round(2);
        let wf = h.workflow();

        // Reviewer acting as manager.
        let err = wf
            .finalize_assessment(round.reviewers[0], round.units[0])
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::unauthorized(round.reviewers[0], Role::ProjectManager)
        );

        // Reviewer acting on someone else's unit.
        let err = wf
            .provide_assessment(round.reviewers[1], round.units[0], Assessment::default(), true)
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::unauthorized(round.reviewers[1], Role::AssessmentProvider)
        );

        // Assessment document owned by someone else.
        let foreign = Document::labelled("ipfs://opinion", round.manager);
        let err = wf
            .provide_assessment(
                round.reviewers[0],
                round.units[0],
                Assessment::new(Some(foreign), vec![]),
                true,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Unauthorized {
                required: Role::DocumentOwner,
                ..
            }
        ));
    }

    #[test]
    fn test_administrative_authority_lifecycle() {
        let h = Harness::new();
        let round = h.sent_round(1);
        let wf = h.workflow();
        let first = Address::from_label("authority-1");
        let second = Address::from_label("authority-2");

        assert!(matches!(
            wf.change_administrative_authority(round.manager, round.project, first),
            Err(WorkflowError::InvalidState(_))
        ));
        wf.set_administrative_authority(round.manager, round.project, first)
            .unwrap();
        assert!(matches!(
            wf.set_administrative_authority(round.manager, round.project, second),
            Err(WorkflowError::InvalidState(_))
        ));
        wf.change_administrative_authority(round.manager, round.project, second)
            .unwrap();
        assert_eq!(
            wf.project(round.project).unwrap().administrative_authority,
            Some(second)
        );
        wf.remove_administrative_authority(round.manager, round.project)
            .unwrap();
        wf.set_administrative_authority(round.manager, round.project, first)
            .unwrap();
    }

    // =========================================================================
    // ASSESSMENT UNITS
    // =========================================================================

    #[test]
    fn test_unit_frozen_after_assessment() {
        let h = Harness::new();
        let round = h.sent_round(1);
        let (reviewer, unit) = (round.reviewers[0], round.units[0]);
        let wf = h.workflow();

        wf.provide_assessment(reviewer, unit, Assessment::default(), true)
            .unwrap();

        assert!(matches!(
            wf.request_main_document_update(reviewer, unit),
            Err(WorkflowError::InvalidState(_))
        ));
        assert!(matches!(
            wf.provide_assessment(reviewer, unit, Assessment::default(), true),
            Err(WorkflowError::InvalidState(_))
        ));
        assert!(matches!(
            wf.add_attachments(round.manager, unit, vec![Document::labelled("x", round.manager)]),
            Err(WorkflowError::InvalidState(_))
        ));

        // The reviewer may still amend the assessment until it is finalized.
        wf.add_assessment_attachments(reviewer, unit, vec![Document::labelled("note", reviewer)])
            .unwrap();
        let snapshot = wf.assessment_unit(unit).unwrap();
        assert_eq!(snapshot.state, UnitState::Assessed);
        assert_eq!(snapshot.assessment.date_provided, T0);
        assert_eq!(snapshot.assessment.attachments.len(), 1);
    }

    #[test]
    fn test_due_date_adjustments() {
        let h = Harness::new();
        let round = h.sent_round(1);
        let (reviewer, unit) = (round.reviewers[0], round.units[0]);
        let wf = h.workflow();

        assert_eq!(wf.assessment_unit(unit).unwrap().assessment_due_date, T0 + days(30));

        wf.request_main_document_update(reviewer, unit).unwrap();
        assert_eq!(wf.assessment_unit(unit).unwrap().assessment_due_date, T0 + days(45));

        assert!(matches!(
            wf.request_assessment_due_date_extension(reviewer, unit, T0 + days(61)),
            Err(WorkflowError::InvalidArgument(_))
        ));
        assert!(matches!(
            wf.request_assessment_due_date_extension(reviewer, unit, T0 + days(45)),
            Err(WorkflowError::InvalidArgument(_))
        ));
        wf.request_assessment_due_date_extension(reviewer, unit, T0 + days(50))
            .unwrap();
        wf.evaluate_assessment_due_date_extension(round.manager, unit, true)
            .unwrap();

        let snapshot = wf.assessment_unit(unit).unwrap();
        assert_eq!(snapshot.assessment_due_date, T0 + days(50));
        assert_eq!(snapshot.requested_assessment_due_date, 0);
        assert!(matches!(
            wf.evaluate_assessment_due_date_extension(round.manager, unit, true),
            Err(WorkflowError::InvalidState(_))
        ));
    }

    #[test]
    fn test_rejected_extension_keeps_due_date() {
        let h = Harness::new();
        let round = h.sent_round(1);
        let (reviewer, unit) = (round.reviewers[0], round.units[0]);
        let wf = h.workflow();

        wf.request_assessment_due_date_extension(reviewer, unit, T0 + days(40))
            .unwrap();
        wf.evaluate_assessment_due_date_extension(round.manager, unit, false)
            .unwrap();
        let snapshot = wf.assessment_unit(unit).unwrap();
        assert_eq!(snapshot.assessment_due_date, T0 + days(30));
        assert_eq!(snapshot.requested_assessment_due_date, 0);
    }

    #[test]
    fn test_finalize_waits_for_due_date_then_counts_tacit_consent() {
        let h = Harness::new();
        let round = h.sent_round(1);
        let unit = round.units[0];
        let wf = h.workflow();
        let mut sub = h
            .node
            .event_bus
            .subscribe(EventFilter::topics(vec![EventTopic::AssessmentUnit]));

        h.clock.set(T0 + days(30) - 1);
        assert!(matches!(
            wf.finalize_assessment(round.manager, unit),
            Err(WorkflowError::InvalidState(_))
        ));

        h.clock.set(T0 + days(30));
        wf.finalize_assessment(round.manager, unit).unwrap();
        assert!(matches!(
            wf.finalize_assessment(round.manager, unit),
            Err(WorkflowError::InvalidState(_))
        ));

        let snapshot = wf.assessment_unit(unit).unwrap();
        assert_eq!(snapshot.state, UnitState::Finalized);
        assert!(snapshot.assessment_finished);

        let events = drain(&mut sub);
        assert_eq!(names(&events), vec!["DeadlineExceeded"]);
        assert_eq!(events[0].entity, EntityRef::Unit(unit));
        assert_eq!(events[0].occurred_at, T0 + days(30));
        assert_eq!(wf.project(round.project).unwrap().num_assessed_dpps, 1);
    }

    #[test]
    fn test_replacing_dpp_answers_update_requests() {
        let h = Harness::new();
        let round = h.sent_round(2);
        let wf = h.workflow();

        wf.request_main_document_update(round.reviewers[0], round.units[0])
            .unwrap();
        wf.set_dpp(round.manager, round.project, Document::labelled("ipfs://dpp-v2", round.manager))
            .unwrap();

        let snapshot = wf.assessment_unit(round.units[0]).unwrap();
        assert!(!snapshot.main_document_update_requested);
        // The unit keeps the document it was sent.
        assert_eq!(snapshot.main_document.id, "ipfs://dpp-v1");
        assert_eq!(
            wf.project(round.project).unwrap().dpp.unwrap().id,
            "ipfs://dpp-v2"
        );
    }
}
