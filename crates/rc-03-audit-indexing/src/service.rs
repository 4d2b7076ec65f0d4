//! # Workflow Event Indexer
//!
//! Consumes the bus and writes one [`AuditRecord`] per envelope.
//!
//! ## Write Path
//!
//! ```text
//! envelope ──► AuditRecord ──► upsert (timeout) ──► ok ──► written / duplicate
//!                                   │
//!                                   └─ retryable error ──► sleep(backoff) ──► retry
//!                                   └─ attempts exhausted / rejected ──► dead letter
//! ```
//!
//! The workflow has already committed by the time an envelope arrives, so a
//! failed write never affects workflow state.

use crate::domain::{AuditRecord, StoreError};
use crate::ports::AuditStore;
use crate::SUBSYSTEM_NAME;
use parking_lot::Mutex;
use shared_bus::{EventEnvelope, Subscription, DLQ_TOPIC};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Retry and timeout settings for store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Total write attempts per envelope, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound for a single `upsert` call.
    pub write_timeout: Duration,
    /// Dead letters kept in memory; the oldest is evicted beyond this.
    pub dead_letter_capacity: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
            write_timeout: Duration::from_secs(5),
            dead_letter_capacity: 1_024,
        }
    }
}

/// Statistics for the indexer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexerStats {
    pub received: u64,
    pub written: u64,
    /// Envelopes the store already held.
    pub duplicates: u64,
    pub retries: u64,
    pub dead_lettered: u64,
}

/// An envelope the indexer gave up on.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub topic: &'static str,
    pub envelope: EventEnvelope,
    pub error: StoreError,
    pub attempts: u32,
}

/// Bus consumer that maintains the audit trail.
pub struct WorkflowEventIndexer {
    store: Arc<dyn AuditStore>,
    config: IndexerConfig,
    stats: Mutex<IndexerStats>,
    dead_letters: Mutex<VecDeque<DeadLetter>>,
}

impl WorkflowEventIndexer {
    pub fn new(store: Arc<dyn AuditStore>, config: IndexerConfig) -> Self {
        Self {
            store,
            config,
            stats: Mutex::new(IndexerStats::default()),
            dead_letters: Mutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub fn stats(&self) -> IndexerStats {
        self.stats.lock().clone()
    }

    /// Snapshot of the retained dead letters, oldest first.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().iter().cloned().collect()
    }

    /// Drains the retained dead letters for replay or export.
    pub fn take_dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().drain(..).collect()
    }

    /// Consumes `subscription` until shutdown is signalled or the bus closes.
    ///
    /// Envelopes already queued when shutdown arrives are still indexed.
    pub async fn run(
        self: Arc<Self>,
        mut subscription: Subscription,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(component = SUBSYSTEM_NAME, "Workflow event indexer started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!(component = SUBSYSTEM_NAME, "Shutdown signal received");
                    break;
                }
                next = subscription.recv() => match next {
                    Some(envelope) => {
                        // Failures are dead-lettered inside index().
                        let _ = self.index(&envelope).await;
                    }
                    None => {
                        info!(component = SUBSYSTEM_NAME, "Event bus closed");
                        return;
                    }
                },
            }
        }

        let mut drained = 0usize;
        while let Ok(Some(envelope)) = subscription.try_recv() {
            let _ = self.index(&envelope).await;
            drained += 1;
        }
        info!(component = SUBSYSTEM_NAME, drained, "Workflow event indexer stopped");
    }

    /// Writes one envelope with retries.
    ///
    /// Returns whether a new row was created. On final failure the envelope
    /// is dead-lettered and the last error returned.
    pub async fn index(&self, envelope: &EventEnvelope) -> Result<bool, StoreError> {
        self.stats.lock().received += 1;
        let record = AuditRecord::from_envelope(envelope);
        let max_attempts = self.config.max_attempts.max(1);
        let mut delay = self.config.initial_backoff;
        let mut attempt = 1;

        loop {
            let started = Instant::now();
            let result = match tokio::time::timeout(
                self.config.write_timeout,
                self.store.upsert(record.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(self.config.write_timeout)),
            };

            match result {
                Ok(true) => {
                    review_telemetry::record_audit_written(started.elapsed().as_secs_f64());
                    self.stats.lock().written += 1;
                    debug!(
                        component = SUBSYSTEM_NAME,
                        sequence = envelope.sequence,
                        entity = %envelope.entity,
                        event = record.event_name.as_str(),
                        "Audit record written"
                    );
                    return Ok(true);
                }
                Ok(false) => {
                    review_telemetry::record_audit_duplicate();
                    self.stats.lock().duplicates += 1;
                    debug!(
                        component = SUBSYSTEM_NAME,
                        sequence = envelope.sequence,
                        "Duplicate audit record skipped"
                    );
                    return Ok(false);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    review_telemetry::record_audit_retry();
                    self.stats.lock().retries += 1;
                    warn!(
                        component = SUBSYSTEM_NAME,
                        sequence = envelope.sequence,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Audit write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.max_backoff);
                    attempt += 1;
                }
                Err(e) => {
                    self.dead_letter(envelope, e.clone(), attempt);
                    return Err(e);
                }
            }
        }
    }

    fn dead_letter(&self, envelope: &EventEnvelope, error: StoreError, attempts: u32) {
        review_telemetry::record_audit_dead_letter();
        self.stats.lock().dead_lettered += 1;
        review_telemetry::log_event!(
            error,
            SUBSYSTEM_NAME,
            "Audit write abandoned",
            topic = DLQ_TOPIC,
            sequence = envelope.sequence,
            entity = %envelope.entity,
            event = envelope.event.name(),
            attempts,
            error = %error
        );
        let mut letters = self.dead_letters.lock();
        if letters.len() >= self.config.dead_letter_capacity.max(1) {
            if let Some(evicted) = letters.pop_front() {
                warn!(
                    component = SUBSYSTEM_NAME,
                    sequence = evicted.envelope.sequence,
                    "Dead-letter list full, oldest entry evicted"
                );
            }
        }
        letters.push_back(DeadLetter {
            topic: DLQ_TOPIC,
            envelope: envelope.clone(),
            error,
            attempts,
        });
    }
}
