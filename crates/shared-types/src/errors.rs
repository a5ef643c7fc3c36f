//! # Error Types
//!
//! Errors raised while constructing shared identifiers.

use thiserror::Error;

/// Invalid identifier input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The identifier was empty after trimming.
    #[error("{0} must not be empty")]
    Empty(&'static str),
}
