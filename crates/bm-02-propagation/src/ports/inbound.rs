//! Inbound ports (API) for belief propagation.

use async_trait::async_trait;
use bm_01_belief_model::BeliefAtom;
use shared_types::AgentId;
use std::time::Duration;

use super::outbound::PeerRef;
use crate::domain::{DeliveryOutcome, PropagationMode};

/// Primary API for pushing a belief to other agents.
#[async_trait]
pub trait PropagationApi: Send + Sync {
    /// Pushes `atom` from `from` to every target.
    ///
    /// Returns one outcome per target, in target order. Never fails as a
    /// whole; per-target errors are reported in the outcome list.
    async fn propagate(
        &self,
        atom: &BeliefAtom,
        from: &AgentId,
        targets: &[PeerRef],
        mode: PropagationMode,
        timeout: Duration,
    ) -> Vec<DeliveryOutcome>;
}
