//! # Event Publisher
//!
//! Defines the publishing side of the event bus.
//!
//! Publishing never blocks and never fails from the producer's point of view.
//! Each subscriber owns an unbounded queue, and envelopes are sequenced and
//! enqueued under a single mutex, so every subscriber observes events in
//! exactly the order they were published.

use crate::events::{EntityRef, EventEnvelope, EventFilter, WorkflowEvent};
use crate::subscriber::{EventStream, Subscription};
use parking_lot::Mutex;
use shared_types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Trait for publishing events to the bus.
///
/// Producers call this while still holding the lock of the entity that
/// changed, which is what keeps per-entity order equal to commit order.
/// Implementations must therefore be cheap and must not block.
pub trait EventPublisher: Send + Sync {
    /// Publish an event.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    fn publish(&self, entity: EntityRef, occurred_at: Timestamp, event: WorkflowEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

struct SubscriberSlot {
    filter: EventFilter,
    sender: mpsc::UnboundedSender<EventEnvelope>,
}

#[derive(Default)]
struct BusState {
    next_sequence: u64,
    subscribers: Vec<SubscriberSlot>,
}

/// In-memory implementation of the event bus.
///
/// Suitable for single-node operation; distributed deployments would use
/// a different implementation (e.g., Kafka).
#[derive(Default)]
pub struct InMemoryEventBus {
    state: Mutex<BusState>,
    events_published: AtomicU64,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events matching a filter.
    ///
    /// Only events published after this call are delivered.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        debug!(topics = ?filter.topics, "New subscription created");
        self.state.lock().subscribers.push(SubscriberSlot {
            filter: filter.clone(),
            sender,
        });
        Subscription::new(receiver, filter)
    }

    /// Get a stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .subscribers
            .iter()
            .filter(|s| !s.sender.is_closed())
            .count()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, entity: EntityRef, occurred_at: Timestamp, event: WorkflowEvent) -> usize {
        let mut state = self.state.lock();
        state.next_sequence += 1;
        let envelope = EventEnvelope {
            sequence: state.next_sequence,
            entity,
            occurred_at,
            event,
        };
        self.events_published.fetch_add(1, Ordering::Relaxed);

        // Closed receivers are pruned here.
        state
            .subscribers
            .retain(|slot| !slot.sender.is_closed());

        let mut delivered = 0;
        for slot in &state.subscribers {
            if slot.filter.matches(&envelope) && slot.sender.send(envelope.clone()).is_ok() {
                delivered += 1;
            }
        }

        debug!(
            sequence = envelope.sequence,
            entity = %envelope.entity,
            event = envelope.event.name(),
            receivers = delivered,
            "Event published"
        );
        delivered
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
