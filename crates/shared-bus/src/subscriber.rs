//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.

use crate::events::{EventEnvelope, EventFilter};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("event bus closed")]
    Closed,
}

/// A subscription handle for receiving events.
///
/// Dropping it detaches the subscriber; the bus prunes it on the next publish.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<EventEnvelope>,
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<EventEnvelope>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next event.
    ///
    /// # Returns
    ///
    /// - `Some(envelope)` - The next matching event
    /// - `None` - The bus was dropped
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        self.receiver.recv().await
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(envelope))` - An event was available
    /// - `Ok(None)` - No event available (would block)
    /// - `Err(SubscriptionError::Closed)` - The bus was dropped
    pub fn try_recv(&mut self) -> Result<Option<EventEnvelope>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(envelope) => Ok(Some(envelope)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.receiver.close();
        debug!(topics = ?self.filter.topics, "Subscription dropped");
    }
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct EventStream {
    subscription: Subscription,
}

impl EventStream {
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// The subscription's filter. Named apart from `StreamExt::filter`.
    #[must_use]
    pub fn subscription_filter(&self) -> &EventFilter {
        self.subscription.filter()
    }
}

impl Stream for EventStream {
    type Item = EventEnvelope;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.subscription.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EntityRef, EventTopic, WorkflowEvent};
    use crate::publisher::InMemoryEventBus;
    use crate::EventPublisher;
    use shared_types::Address;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_subscription_recv() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        bus.publish(EntityRef::Registry, 10, WorkflowEvent::AssessmentFinalized);

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");

        assert_eq!(received.event, WorkflowEvent::AssessmentFinalized);
        assert_eq!(received.occurred_at, 10);
    }

    #[tokio::test]
    async fn test_subscription_filter() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::AccessControl]));

        // Filtered out
        bus.publish(EntityRef::Registry, 0, WorkflowEvent::DeadlineExceeded);
        bus.publish(
            EntityRef::Registry,
            0,
            WorkflowEvent::OwnersAdded {
                ids: vec![Address::from_label("o")],
            },
        );

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");

        assert_eq!(received.event.name(), "OwnersAdded");
        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_subscription_drop_cleanup() {
        let bus = InMemoryEventBus::new();

        {
            let _sub1 = bus.subscribe(EventFilter::all());
            let _sub2 = bus.subscribe(EventFilter::all());
            assert_eq!(bus.subscriber_count(), 2);
        }

        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(EntityRef::Registry, 0, WorkflowEvent::DeadlineExceeded), 0);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_recv_none_after_bus_dropped() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        drop(bus);
        assert!(sub.recv().await.is_none());
        assert_eq!(sub.try_recv(), Err(SubscriptionError::Closed));
    }

    #[tokio::test]
    async fn test_event_stream_yields_in_order() {
        let bus = InMemoryEventBus::new();
        let mut stream = bus.event_stream(EventFilter::all());
        for ts in 1..=3 {
            bus.publish(EntityRef::Registry, ts, WorkflowEvent::AssessmentFinalized);
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            let env = timeout(Duration::from_millis(100), stream.next())
                .await
                .expect("timeout")
                .expect("event");
            seen.push(env.occurred_at);
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(stream.subscription_filter().topics.is_empty());
    }
}
