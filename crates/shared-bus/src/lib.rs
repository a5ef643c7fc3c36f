//! # Shared Bus - Belief Event Bus
//!
//! Carries [`BeliefEvent`]s from agents and the coordinator to consumers
//! outside the belief layer.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe(filter)  ┌──────────────────┐
//! │ Agent actors │ ────────────→ │  Event Bus   │ ──────────────────→ │ Coalitions, roles│
//! │ Coordinator  │               │ (broadcast)  │                     │ specialization   │
//! └──────────────┘               └──────────────┘                     └──────────────────┘
//! ```
//!
//! Publishing with no subscribers is not an error. Events are observations
//! only; consumers never write belief state back through the bus.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{BeliefEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
