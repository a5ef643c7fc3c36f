//! # Agent Actor
//!
//! One tokio task per agent. The task exclusively owns the agent's
//! [`BeliefSet`] and mutates it only while handling a dequeued
//! [`AgentMessage`], one at a time, in arrival order.
//!
//! ## Lifecycle
//!
//! ```text
//! spawn_agent ──→ Initialized ──run()──→ Active ──mailbox closed──→ (task ends)
//! ```
//!
//! ## Neighbor Sync
//!
//! ```text
//! A: SyncWith(B) ──spawn──→ fetch B's set (sync_timeout)
//!                              │
//! A: AdoptNeighborSet ←────────┘
//!    merged = merge(A, B)
//!    A := merged
//!    B ← ReconcileBeliefSet(fetched, merged)
//! ```
//!
//! The reconcile step is a separate message, so B may have changed since the
//! fetch. B adopts `merged` and folds its own later writes back in.
//!
//! Fetches and propagation run in spawned tasks so two agents syncing with
//! each other never wait on one another's mailbox.

mod actor;
mod handle;

pub use actor::{spawn_agent, spawn_agent_with, AgentActor};
pub use handle::AgentHandle;

use bm_01_belief_model::{AtomOptions, BeliefAtom, BeliefSet, MergeStats};
use bm_02_propagation::{AdmissionDecision, DeliveryOutcome, PeerRef, PropagationMode};
use serde::{Deserialize, Serialize};
use shared_types::{AgentId, BeliefContent, BeliefId};
use std::fmt;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::container::{AgentConfig, AgentConfigUpdate};
use crate::error::RuntimeError;

/// Actor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    Initialized,
    Active,
}

/// Per-agent counters returned by `get-metrics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub updates_received: u64,
    pub updates_accepted: u64,
    pub updates_rejected: u64,
    pub beliefs_sent: u64,
    pub conflicts_resolved: u64,
    pub syncs_completed: u64,
    pub syncs_failed: u64,
    /// Presence coverage of the local and neighbor sets seen at the most
    /// recent sync, before merging.
    pub last_convergence_score: Option<f64>,
}

/// Result of one completed neighbor sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub neighbor: AgentId,
    pub inserted: usize,
    pub conflicts_resolved: usize,
    pub replaced: usize,
    pub coverage_before: f64,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        self.inserted + self.conflicts_resolved + self.replaced > 0
    }
}

/// One neighbor's entry in a `sync-now` round.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub neighbor: AgentId,
    pub result: Result<SyncReport, RuntimeError>,
}

/// Options for `propagate`. Empty `targets` means the agent's neighbors.
#[derive(Clone, Default)]
pub struct PropagateRequest {
    pub targets: Vec<PeerRef>,
    pub mode: Option<PropagationMode>,
    pub timeout: Option<Duration>,
}

impl PropagateRequest {
    pub fn to(targets: Vec<PeerRef>) -> Self {
        Self {
            targets,
            ..Self::default()
        }
    }

    pub fn mode(mut self, mode: PropagationMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

pub type BeliefPredicate = Box<dyn Fn(&BeliefAtom) -> bool + Send>;

type Reply<T> = oneshot::Sender<T>;

/// Mailbox messages.
pub enum AgentMessage {
    AuthorBelief {
        content: BeliefContent,
        confidence: f64,
        options: AtomOptions,
        reply: Reply<BeliefAtom>,
    },
    IngestBelief {
        atom: BeliefAtom,
        reply: Reply<()>,
    },
    GetBeliefSet {
        reply: Reply<BeliefSet>,
    },
    GetBelief {
        id: BeliefId,
        reply: Reply<Option<BeliefAtom>>,
    },
    QueryBeliefs {
        predicate: BeliefPredicate,
        reply: Reply<Vec<BeliefAtom>>,
    },
    /// Adopt another set's beliefs wholesale, keeping this owner.
    ReplaceBeliefSet {
        set: BeliefSet,
        reply: Option<Reply<()>>,
    },
    /// Adopt `synced`, computed from the snapshot `base`, keeping any
    /// beliefs written since `base` was taken.
    ReconcileBeliefSet {
        base: BeliefSet,
        synced: BeliefSet,
        reply: Option<Reply<MergeStats>>,
    },
    SetNeighbors {
        neighbors: Vec<AgentHandle>,
        reply: Reply<()>,
    },
    UpdateConfig {
        update: AgentConfigUpdate,
        reply: Reply<Result<AgentConfig, RuntimeError>>,
    },
    GetConfig {
        reply: Reply<AgentConfig>,
    },
    Propagate {
        belief_id: BeliefId,
        request: PropagateRequest,
        reply: Reply<Result<Vec<DeliveryOutcome>, RuntimeError>>,
    },
    /// Sync with every neighbor, one after another.
    SyncNow {
        reply: Option<Reply<Vec<SyncOutcome>>>,
    },
    SyncWith {
        neighbor: AgentHandle,
        reply: Option<Reply<Result<SyncReport, RuntimeError>>>,
    },
    /// Inbound update from a peer; `ack` is set for sync propagation.
    BeliefUpdate {
        atom: BeliefAtom,
        from: AgentId,
        ack: Option<Reply<AdmissionDecision>>,
    },
    GetMetrics {
        reply: Reply<AgentMetrics>,
    },
    GetState {
        reply: Reply<AgentState>,
    },
    /// Second half of a neighbor sync, sent by the agent's own fetch task.
    AdoptNeighborSet {
        neighbor: AgentHandle,
        fetched: Result<BeliefSet, RuntimeError>,
        reply: Option<Reply<Result<SyncReport, RuntimeError>>>,
    },
    /// Sent by the agent's own sync-round task when it finishes.
    SyncRoundFinished,
}

impl AgentMessage {
    fn kind(&self) -> &'static str {
        match self {
            Self::AuthorBelief { .. } => "author_belief",
            Self::IngestBelief { .. } => "ingest_belief",
            Self::GetBeliefSet { .. } => "get_belief_set",
            Self::GetBelief { .. } => "get_belief",
            Self::QueryBeliefs { .. } => "query_beliefs",
            Self::ReplaceBeliefSet { .. } => "replace_belief_set",
            Self::ReconcileBeliefSet { .. } => "reconcile_belief_set",
            Self::SetNeighbors { .. } => "set_neighbors",
            Self::UpdateConfig { .. } => "update_config",
            Self::GetConfig { .. } => "get_config",
            Self::Propagate { .. } => "propagate",
            Self::SyncNow { .. } => "sync_now",
            Self::SyncWith { .. } => "sync_with",
            Self::BeliefUpdate { .. } => "belief_update",
            Self::GetMetrics { .. } => "get_metrics",
            Self::GetState { .. } => "get_state",
            Self::AdoptNeighborSet { .. } => "adopt_neighbor_set",
            Self::SyncRoundFinished => "sync_round_finished",
        }
    }
}

impl fmt::Debug for AgentMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
