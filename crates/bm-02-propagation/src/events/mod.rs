//! Error types for the propagation subsystem.

use shared_types::AgentId;
use thiserror::Error;

/// Failure of a single remote interaction.
///
/// Always scoped to one target; never aborts a multi-target operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropagationError {
    #[error("no acknowledgement from {target} within {timeout_ms}ms")]
    Timeout { target: AgentId, timeout_ms: u64 },

    #[error("agent {0} is unreachable")]
    Unreachable(AgentId),
}

/// A propagation mode name other than `async` or `sync`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown propagation mode: {0}")]
pub struct UnknownPropagationMode(pub String);
