//! # Propagation Service
//!
//! Implements [`PropagationApi`] over the [`BeliefPeer`] outbound port.
//!
//! ## Modes
//!
//! - **Async**: `deliver` is called on each target in order. It only
//!   enqueues, so the call returns before any target processes the atom.
//!   An enqueue failure is still reported for that target.
//! - **Sync**: all targets are asked concurrently; each acknowledgement is
//!   awaited under its own timeout.

use async_trait::async_trait;
use bm_01_belief_model::BeliefAtom;
use futures::future::join_all;
use shared_types::AgentId;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{
    AdmissionDecision, DeliveryOutcome, DeliveryStatus, PropagationConfig, PropagationMode,
    PropagationSummary,
};
use crate::events::PropagationError;
use crate::ports::inbound::PropagationApi;
use crate::ports::outbound::{BeliefPeer, PeerRef};

/// Belief propagation service.
///
/// Stateless apart from its defaults; cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct PropagationService {
    config: PropagationConfig,
}

impl PropagationService {
    pub fn new(config: PropagationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Propagates with the configured mode and timeout.
    pub async fn propagate_default(
        &self,
        atom: &BeliefAtom,
        from: &AgentId,
        targets: &[PeerRef],
    ) -> Vec<DeliveryOutcome> {
        self.propagate(atom, from, targets, self.config.mode, self.config.timeout)
            .await
    }

    async fn send_async(
        atom: &BeliefAtom,
        from: &AgentId,
        targets: &[PeerRef],
    ) -> Vec<DeliveryOutcome> {
        let mut outcomes = Vec::with_capacity(targets.len());
        for peer in targets {
            let status = match peer.deliver(atom.clone(), from.clone()).await {
                Ok(()) => DeliveryStatus::Sent,
                Err(e) => {
                    warn!(target_agent = %peer.agent_id(), error = %e, "Async delivery failed");
                    DeliveryStatus::Failed(e)
                }
            };
            outcomes.push(DeliveryOutcome {
                target: peer.agent_id().clone(),
                status,
            });
        }
        outcomes
    }

    async fn send_sync(
        atom: &BeliefAtom,
        from: &AgentId,
        targets: &[PeerRef],
        timeout: Duration,
    ) -> Vec<DeliveryOutcome> {
        let requests = targets
            .iter()
            .map(|peer| Self::await_ack(peer.as_ref(), atom.clone(), from.clone(), timeout));
        join_all(requests).await
    }

    async fn await_ack(
        peer: &dyn BeliefPeer,
        atom: BeliefAtom,
        from: AgentId,
        timeout: Duration,
    ) -> DeliveryOutcome {
        let target = peer.agent_id().clone();
        let status = match tokio::time::timeout(timeout, peer.deliver_with_ack(atom, from)).await
        {
            Ok(Ok(AdmissionDecision::Accepted { .. })) => DeliveryStatus::Accepted,
            Ok(Ok(AdmissionDecision::Rejected(reason))) => DeliveryStatus::Rejected(reason),
            Ok(Err(e)) => {
                warn!(target_agent = %target, error = %e, "Sync delivery failed");
                DeliveryStatus::Failed(e)
            }
            Err(_) => {
                warn!(
                    target_agent = %target,
                    timeout_ms = timeout.as_millis() as u64,
                    "Acknowledgement timed out"
                );
                DeliveryStatus::Failed(PropagationError::Timeout {
                    target: target.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };
        DeliveryOutcome { target, status }
    }
}

#[async_trait]
impl PropagationApi for PropagationService {
    async fn propagate(
        &self,
        atom: &BeliefAtom,
        from: &AgentId,
        targets: &[PeerRef],
        mode: PropagationMode,
        timeout: Duration,
    ) -> Vec<DeliveryOutcome> {
        let outcomes = match mode {
            PropagationMode::Async => Self::send_async(atom, from, targets).await,
            PropagationMode::Sync => Self::send_sync(atom, from, targets, timeout).await,
        };

        let summary = PropagationSummary::from_outcomes(&outcomes);
        debug!(
            agent = %from,
            belief_id = %atom.id,
            %mode,
            targets = targets.len(),
            delivered = summary.delivered(),
            failed = summary.failed,
            "Belief propagated"
        );
        outcomes
    }
}
