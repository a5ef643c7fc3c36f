//! Error types for the belief model.

use thiserror::Error;

/// Uncertainty aggregation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UncertaintyError {
    #[error("cannot aggregate an empty set of beliefs")]
    EmptyInput,

    #[error("unknown uncertainty model: {0}")]
    UnknownModel(String),

    #[error("unknown aggregation method: {0}")]
    UnknownMethod(String),
}

/// A conflict-resolution strategy name that matches no strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resolution strategy: {0}")]
pub struct UnknownStrategy(pub String);
