//! Runtime errors.

use bm_02_propagation::PropagationError;
use bm_03_consistency::ConsistencyError;
use shared_types::{AgentId, BeliefId};
use thiserror::Error;

use crate::container::ConfigError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// The agent's mailbox is closed or it dropped the reply.
    #[error("agent {0} is not running")]
    AgentUnavailable(AgentId),

    #[error("agent {agent} did not answer within {timeout_ms}ms")]
    Timeout { agent: AgentId, timeout_ms: u64 },

    #[error("agent {agent} holds no belief {belief_id}")]
    UnknownBelief { agent: AgentId, belief_id: BeliefId },

    #[error("no agents available for {0}")]
    EmptyPopulation(&'static str),

    #[error(transparent)]
    Propagation(#[from] PropagationError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
