//! # Event Publisher
//!
//! Publishing side of the belief event bus.

use crate::events::{BeliefEvent, EventFilter};
use crate::subscriber::{EventStream, Subscription, SubscriptionGuard};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event; returns how many subscribers received it.
    ///
    /// Having no subscribers is not an error.
    async fn publish(&self, event: BeliefEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory event bus on `tokio::sync::broadcast`.
///
/// Slow subscribers lag and skip events rather than blocking publishers.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<BeliefEvent>,
    /// Active subscription count by topic key.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,
    events_published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let guard = self.track(&filter);
        debug!(topics = ?filter.topics, agents = filter.agents.len(), "New subscription created");
        Subscription::new(receiver, filter, guard)
    }

    /// Stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        let receiver = self.sender.subscribe();
        let guard = self.track(&filter);
        EventStream::new(receiver, filter, guard)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Active subscriptions whose filter has exactly this topic key
    /// (`format!("{:?}", filter.topics)`).
    #[must_use]
    pub fn subscriptions_for(&self, topic_key: &str) -> usize {
        self.subscriptions
            .read()
            .map(|subs| subs.get(topic_key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn track(&self, filter: &EventFilter) -> SubscriptionGuard {
        let topic_key = format!("{:?}", filter.topics);
        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(topic_key.clone()).or_insert(0) += 1;
        }
        SubscriptionGuard::new(self.subscriptions.clone(), topic_key)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: BeliefEvent) -> usize {
        let topic = event.topic();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(topic = ?topic, receivers, "Event published");
                receivers
            }
            Err(_) => {
                trace!(topic = ?topic, "Event published with no subscribers");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
