//! # Shared Bus - Ordered Event Bus for Workflow Transitions
//!
//! Every committed workflow transition is published here exactly once and
//! fanned out to subscribers such as the audit indexer.
//!
//! ## Delivery Rules
//!
//! - Producers publish synchronously while holding the entity lock
//! - Each envelope carries a bus-wide `sequence`; per-entity order is commit order
//! - Subscriber queues are unbounded, so a slow consumer never stalls a producer
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Workflow    │                    │   Indexer    │
//! │   Service    │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EntityRef, EventEnvelope, EventFilter, EventTopic, WorkflowEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Dead-letter target for envelopes a consumer gave up on.
pub const DLQ_TOPIC: &str = "dlq.audit";
