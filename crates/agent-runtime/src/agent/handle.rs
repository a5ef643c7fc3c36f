//! Cloneable client for one agent's mailbox.

use async_trait::async_trait;
use bm_01_belief_model::{AtomOptions, BeliefAtom, BeliefSet, MergeStats};
use bm_02_propagation::{AdmissionDecision, BeliefPeer, DeliveryOutcome, PeerRef, PropagationError};
use shared_types::{AgentId, BeliefContent, BeliefId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use super::{
    AgentMessage, AgentMetrics, AgentState, PropagateRequest, SyncOutcome, SyncReport,
};
use crate::container::{AgentConfig, AgentConfigUpdate};
use crate::error::RuntimeError;

/// Address of a running agent.
///
/// Requests fail with [`RuntimeError::AgentUnavailable`] once the actor has
/// stopped. None of them time out on their own; wrap with
/// [`AgentHandle::within`] where a bound is needed.
#[derive(Clone)]
pub struct AgentHandle {
    id: AgentId,
    sender: mpsc::UnboundedSender<AgentMessage>,
}

impl AgentHandle {
    pub(crate) fn new(id: AgentId, sender: mpsc::UnboundedSender<AgentMessage>) -> Self {
        Self { id, sender }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    /// This agent as a propagation target.
    pub fn as_peer(&self) -> PeerRef {
        Arc::new(self.clone())
    }

    pub(crate) fn send(&self, message: AgentMessage) -> Result<(), RuntimeError> {
        self.sender
            .send(message)
            .map_err(|_| RuntimeError::AgentUnavailable(self.id.clone()))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> AgentMessage,
    ) -> Result<T, RuntimeError> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply))?;
        response
            .await
            .map_err(|_| RuntimeError::AgentUnavailable(self.id.clone()))
    }

    /// Bounds any request on this handle by `timeout`.
    pub async fn within<T, F>(&self, timeout: Duration, request: F) -> Result<T, RuntimeError>
    where
        F: std::future::Future<Output = Result<T, RuntimeError>>,
    {
        tokio::time::timeout(timeout, request)
            .await
            .unwrap_or_else(|_| {
                Err(RuntimeError::Timeout {
                    agent: self.id.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            })
    }

    // =========================================================================
    // AGENT CONTROL SURFACE
    // =========================================================================

    /// Creates a belief owned by this agent and returns it.
    pub async fn author_belief(
        &self,
        content: BeliefContent,
        confidence: f64,
        options: AtomOptions,
    ) -> Result<BeliefAtom, RuntimeError> {
        self.request(|reply| AgentMessage::AuthorBelief {
            content,
            confidence,
            options,
            reply,
        })
        .await
    }

    /// Stores an externally authored atom as-is.
    pub async fn ingest(&self, atom: BeliefAtom) -> Result<(), RuntimeError> {
        self.request(|reply| AgentMessage::IngestBelief { atom, reply })
            .await
    }

    pub async fn belief_set(&self) -> Result<BeliefSet, RuntimeError> {
        self.request(|reply| AgentMessage::GetBeliefSet { reply })
            .await
    }

    pub async fn belief(&self, id: &BeliefId) -> Result<Option<BeliefAtom>, RuntimeError> {
        let id = id.clone();
        self.request(|reply| AgentMessage::GetBelief { id, reply })
            .await
    }

    pub async fn query<F>(&self, predicate: F) -> Result<Vec<BeliefAtom>, RuntimeError>
    where
        F: Fn(&BeliefAtom) -> bool + Send + 'static,
    {
        self.request(|reply| AgentMessage::QueryBeliefs {
            predicate: Box::new(predicate),
            reply,
        })
        .await
    }

    pub async fn replace_belief_set(&self, set: BeliefSet) -> Result<(), RuntimeError> {
        self.request(|reply| AgentMessage::ReplaceBeliefSet {
            set,
            reply: Some(reply),
        })
        .await
    }

    /// Hands the agent a set derived from its snapshot `base`. Beliefs the
    /// agent wrote after `base` are merged back in; the stats count them.
    pub async fn reconcile_belief_set(
        &self,
        base: BeliefSet,
        synced: BeliefSet,
    ) -> Result<MergeStats, RuntimeError> {
        self.request(|reply| AgentMessage::ReconcileBeliefSet {
            base,
            synced,
            reply: Some(reply),
        })
        .await
    }

    pub async fn set_neighbors(&self, neighbors: Vec<AgentHandle>) -> Result<(), RuntimeError> {
        self.request(|reply| AgentMessage::SetNeighbors { neighbors, reply })
            .await
    }

    /// Syncs with every neighbor in order; per-neighbor failures are in the
    /// outcome list.
    pub async fn sync_now(&self) -> Result<Vec<SyncOutcome>, RuntimeError> {
        self.request(|reply| AgentMessage::SyncNow { reply: Some(reply) })
            .await
    }

    pub async fn sync_with(&self, neighbor: &AgentHandle) -> Result<SyncReport, RuntimeError> {
        let neighbor = neighbor.clone();
        self.request(|reply| AgentMessage::SyncWith {
            neighbor,
            reply: Some(reply),
        })
        .await?
    }

    pub async fn propagate(
        &self,
        belief_id: &BeliefId,
        request: PropagateRequest,
    ) -> Result<Vec<DeliveryOutcome>, RuntimeError> {
        let belief_id = belief_id.clone();
        self.request(|reply| AgentMessage::Propagate {
            belief_id,
            request,
            reply,
        })
        .await?
    }

    /// Applies a partial update; returns the configuration now in effect.
    pub async fn update_config(
        &self,
        update: AgentConfigUpdate,
    ) -> Result<AgentConfig, RuntimeError> {
        self.request(|reply| AgentMessage::UpdateConfig { update, reply })
            .await?
    }

    pub async fn config(&self) -> Result<AgentConfig, RuntimeError> {
        self.request(|reply| AgentMessage::GetConfig { reply })
            .await
    }

    pub async fn metrics(&self) -> Result<AgentMetrics, RuntimeError> {
        self.request(|reply| AgentMessage::GetMetrics { reply })
            .await
    }

    pub async fn state(&self) -> Result<AgentState, RuntimeError> {
        self.request(|reply| AgentMessage::GetState { reply })
            .await
    }
}

impl fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentHandle")
            .field("id", &self.id)
            .field("running", &self.is_running())
            .finish()
    }
}

#[async_trait]
impl BeliefPeer for AgentHandle {
    fn agent_id(&self) -> &AgentId {
        &self.id
    }

    async fn deliver(&self, atom: BeliefAtom, from: AgentId) -> Result<(), PropagationError> {
        self.send(AgentMessage::BeliefUpdate {
            atom,
            from,
            ack: None,
        })
        .map_err(|_| PropagationError::Unreachable(self.id.clone()))
    }

    async fn deliver_with_ack(
        &self,
        atom: BeliefAtom,
        from: AgentId,
    ) -> Result<AdmissionDecision, PropagationError> {
        let (ack, decision) = oneshot::channel();
        self.send(AgentMessage::BeliefUpdate {
            atom,
            from,
            ack: Some(ack),
        })
        .map_err(|_| PropagationError::Unreachable(self.id.clone()))?;
        decision
            .await
            .map_err(|_| PropagationError::Unreachable(self.id.clone()))
    }
}
