//! Outbound ports (SPI) for belief propagation.

use async_trait::async_trait;
use bm_01_belief_model::BeliefAtom;
use shared_types::AgentId;
use std::sync::Arc;

use crate::domain::AdmissionDecision;
use crate::events::PropagationError;

/// A remote agent that can receive belief updates.
///
/// Implemented by the agent runtime over actor mailboxes.
#[async_trait]
pub trait BeliefPeer: Send + Sync {
    /// Identity of the receiving agent.
    fn agent_id(&self) -> &AgentId;

    /// Enqueues an update without waiting for it to be processed.
    async fn deliver(&self, atom: BeliefAtom, from: AgentId) -> Result<(), PropagationError>;

    /// Enqueues an update and waits for the admission decision.
    async fn deliver_with_ack(
        &self,
        atom: BeliefAtom,
        from: AgentId,
    ) -> Result<AdmissionDecision, PropagationError>;
}

/// Shared handle to a propagation target.
pub type PeerRef = Arc<dyn BeliefPeer>;
