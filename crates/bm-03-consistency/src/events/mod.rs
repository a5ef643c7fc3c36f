//! Error types for the consistency subsystem.

use bm_01_belief_model::UncertaintyError;
use shared_types::AgentId;
use thiserror::Error;

/// Consistency management errors.
///
/// Estimator failures and time-bound violations are reported here as
/// values; callers decide whether they are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsistencyError {
    #[error("need at least 2 convergence samples, have {points}")]
    InsufficientData { points: usize },

    #[error("convergence is not improving (average delta {average_delta})")]
    NoImprovement { average_delta: f64 },

    #[error("estimated {estimated_secs:.3}s to consistency exceeds bound of {bound_secs:.3}s")]
    ExceedsTimeBound { estimated_secs: f64, bound_secs: f64 },

    #[error("agent {0} has no belief set")]
    UnknownAgent(AgentId),

    #[error("batch {batch_id} cannot be scheduled with time scale {time_scale}")]
    UnschedulableBatch { batch_id: usize, time_scale: f64 },

    #[error("aggregation failed: {0}")]
    Aggregation(#[from] UncertaintyError),
}
