//! # Audit Trail Scenarios
//!
//! Workflow transitions flowing through the bus into the audit store, with
//! redelivery and store failures.

#[cfg(test)]
mod tests {
    use crate::fixtures::{drain, Harness, T0};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rc_02_review_workflow::{Assessment, ReviewWorkflowApi};
    use rc_03_audit_indexing::{
        to_datetime, AuditRecord, AuditStore, IndexerConfig, InMemoryAuditStore, StoreError,
        WorkflowEventIndexer,
    };
    use shared_bus::{EventFilter, EventPublisher, DLQ_TOPIC};
    use shared_types::days;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;
    use tokio::time::timeout;

    /// Store that is down for the first `outage` writes.
    struct OutageStore {
        inner: InMemoryAuditStore,
        outage: AtomicU32,
    }

    #[async_trait]
    impl AuditStore for OutageStore {
        async fn upsert(&self, record: AuditRecord) -> Result<bool, StoreError> {
            let down = self
                .outage
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if down {
                return Err(StoreError::Unavailable("primary unreachable".into()));
            }
            self.inner.upsert(record).await
        }

        async fn by_entity(
            &self,
            entity_id: &str,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<AuditRecord>, StoreError> {
            self.inner.by_entity(entity_id, from, to).await
        }

        async fn in_range(
            &self,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<AuditRecord>, StoreError> {
            self.inner.in_range(from, to).await
        }
    }

    async fn wait_for_rows(store: &InMemoryAuditStore, rows: usize) {
        timeout(Duration::from_secs(5), async {
            while store.len() < rows {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("indexer did not catch up");
    }

    #[tokio::test]
    async fn test_unit_history_is_recorded_in_order() {
        let h = Harness::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = h.node.spawn_indexer(shutdown_rx);

        let round = h.sent_round(1);
        let (reviewer, unit) = (round.reviewers[0], round.units[0]);
        h.clock.advance(days(1));
        h.workflow()
            .request_main_document_update(reviewer, unit)
            .unwrap();
        h.clock.advance(days(1));
        h.workflow()
            .provide_assessment(reviewer, unit, Assessment::default(), true)
            .unwrap();

        let published = h.node.event_bus.events_published() as usize;
        wait_for_rows(&h.node.audit_store, published).await;

        let rows = h
            .node
            .audit_store
            .by_entity(&unit.to_string(), to_datetime(T0), to_datetime(T0 + days(3)))
            .await
            .unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.event_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "AssessmentUnitCreated",
                "MainDocumentUpdateRequested",
                "AssessmentProvided",
            ]
        );
        assert_eq!(rows[1].timestamp, to_datetime(T0 + days(1)));
        assert!(rows[1].description.contains("due date moved to"));
        assert!(rows.windows(2).all(|w| w[0].sequence < w[1].sequence));

        // The milestone belongs to the project, not the unit.
        let project_rows = h
            .node
            .audit_store
            .by_entity(&round.project.to_string(), to_datetime(T0), to_datetime(T0 + days(3)))
            .await
            .unwrap();
        assert_eq!(
            project_rows.last().unwrap().event_name,
            "AllDppsAssessed"
        );

        // Only the second day's transitions.
        let day_two = h
            .node
            .audit_store
            .in_range(to_datetime(T0 + days(1)), to_datetime(T0 + days(1)))
            .await
            .unwrap();
        assert_eq!(day_two.len(), 1);

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_redelivered_envelope_is_deduplicated() {
        let h = Harness::new();
        let mut sub = h.node.event_bus.subscribe(EventFilter::all());
        h.sent_round(2);

        let envelopes = drain(&mut sub);
        for envelope in &envelopes {
            assert!(h.node.indexer.index(envelope).await.unwrap());
        }
        for envelope in &envelopes {
            assert!(!h.node.indexer.index(envelope).await.unwrap());
        }

        assert_eq!(h.node.audit_store.len(), envelopes.len());
        assert_eq!(h.node.indexer.stats().duplicates, envelopes.len() as u64);
    }

    #[tokio::test]
    async fn test_same_second_transitions_are_kept_apart() {
        let h = Harness::new();
        let mut sub = h.node.event_bus.subscribe(EventFilter::all());
        let round = h.sent_round(1);
        let wf = h.workflow();
        wf.request_main_document_update(round.reviewers[0], round.units[0])
            .unwrap();
        wf.request_main_document_update(round.reviewers[0], round.units[0])
            .unwrap();

        for envelope in drain(&mut sub) {
            h.node.indexer.index(&envelope).await.unwrap();
        }
        let rows = h
            .node
            .audit_store
            .by_entity(&round.units[0].to_string(), to_datetime(T0), to_datetime(T0))
            .await
            .unwrap();
        let requests = rows
            .iter()
            .filter(|r| r.event_name == "MainDocumentUpdateRequested")
            .count();
        assert_eq!(requests, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_outage_is_ridden_out() {
        let h = Harness::new();
        let mut sub = h.node.event_bus.subscribe(EventFilter::all());
        h.sent_round(2);

        let store = Arc::new(OutageStore {
            inner: InMemoryAuditStore::new(),
            outage: AtomicU32::new(3),
        });
        let indexer = WorkflowEventIndexer::new(store.clone(), IndexerConfig::default());

        let envelopes = drain(&mut sub);
        for envelope in &envelopes {
            indexer.index(envelope).await.unwrap();
        }

        let stats = indexer.stats();
        assert_eq!(stats.retries, 3);
        assert_eq!(stats.written, envelopes.len() as u64);
        assert_eq!(store.inner.len(), envelopes.len());
        assert!(indexer.dead_letters().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_store_never_blocks_the_workflow() {
        let h = Harness::new();
        let store = Arc::new(OutageStore {
            inner: InMemoryAuditStore::new(),
            outage: AtomicU32::new(u32::MAX),
        });
        let indexer = Arc::new(WorkflowEventIndexer::new(
            store,
            IndexerConfig {
                max_attempts: 2,
                ..IndexerConfig::default()
            },
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let subscription = h.node.event_bus.subscribe(EventFilter::all());
        let task = tokio::spawn(indexer.clone().run(subscription, shutdown_rx));

        let round = h.sent_round(1);
        h.workflow()
            .provide_assessment(round.reviewers[0], round.units[0], Assessment::default(), true)
            .unwrap();
        assert!(h.workflow().project(round.project).unwrap().all_dpps_assessed);

        let published = h.node.event_bus.events_published();
        timeout(Duration::from_secs(60), async {
            while indexer.stats().dead_lettered < published {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let letters = indexer.dead_letters();
        assert!(letters.iter().all(|l| l.topic == DLQ_TOPIC && l.attempts == 2));
        assert!(letters.windows(2).all(|w| w[0].envelope.sequence < w[1].envelope.sequence));

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
