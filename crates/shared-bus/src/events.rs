//! # Belief Events
//!
//! Events published by agents and the coordinator for consumers outside the
//! belief layer (coalition formation, role adaptation, specialization
//! detection). Consumers observe; they never mutate belief state through
//! the bus.

use serde::{Deserialize, Serialize};
use shared_types::{AgentId, BeliefId};
use uuid::Uuid;

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BeliefEvent {
    // =========================================================================
    // AGENT: LOCAL BELIEFS
    // =========================================================================
    /// An agent authored or ingested a belief.
    BeliefAuthored {
        agent: AgentId,
        belief_id: BeliefId,
        confidence: f64,
    },

    // =========================================================================
    // AGENT: PROPAGATION
    // =========================================================================
    /// An agent decided on an inbound belief update.
    UpdateAdmitted {
        agent: AgentId,
        from: AgentId,
        belief_id: BeliefId,
        accepted: bool,
    },

    /// An agent finished a sync round with one neighbor.
    SyncCompleted {
        agent: AgentId,
        neighbor: AgentId,
        /// Whether the local set changed.
        changed: bool,
    },

    // =========================================================================
    // COORDINATOR: CONSISTENCY
    // =========================================================================
    /// A population convergence score was recorded.
    ConvergenceChecked {
        score: f64,
        converged: bool,
        global_version: u64,
    },

    /// A synchronisation plan finished (completed, stopped early or failed).
    PlanCompleted {
        run_id: Uuid,
        batches_run: usize,
        early_stop: bool,
        failed: bool,
    },

    /// A global alignment pass finished.
    AlignmentCompleted {
        run_id: Uuid,
        aligned: usize,
        skipped: usize,
        mean_alignment: f64,
    },
}

impl BeliefEvent {
    /// Get the topic for this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::BeliefAuthored { .. } => EventTopic::Beliefs,
            Self::UpdateAdmitted { .. } | Self::SyncCompleted { .. } => EventTopic::Propagation,
            Self::ConvergenceChecked { .. }
            | Self::PlanCompleted { .. }
            | Self::AlignmentCompleted { .. } => EventTopic::Consistency,
        }
    }

    /// The agent that emitted the event; `None` for coordinator events.
    #[must_use]
    pub fn agent(&self) -> Option<&AgentId> {
        match self {
            Self::BeliefAuthored { agent, .. }
            | Self::UpdateAdmitted { agent, .. }
            | Self::SyncCompleted { agent, .. } => Some(agent),
            Self::ConvergenceChecked { .. }
            | Self::PlanCompleted { .. }
            | Self::AlignmentCompleted { .. } => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Locally authored beliefs.
    Beliefs,
    /// Inbound updates and neighbor syncs.
    Propagation,
    /// Population-level checks, plans and alignment.
    Consistency,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Emitting agents to include. Empty means any emitter, including the
    /// coordinator.
    pub agents: Vec<AgentId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            agents: Vec::new(),
        }
    }

    /// Create a filter for events emitted by specific agents.
    #[must_use]
    pub fn from_agents(agents: Vec<AgentId>) -> Self {
        Self {
            topics: Vec::new(),
            agents,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BeliefEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let agent_match = self.agents.is_empty()
            || event.agent().is_some_and(|agent| self.agents.contains(agent));

        topic_match && agent_match
    }
}
