//! # Shared Types Crate
//!
//! Identifiers, time helpers and the belief content model used across every
//! Belief-Mesh subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `AgentId`, `BeliefId` and `BeliefContent` are
//!   defined here and nowhere else.
//! - **Closed Content Model**: belief content is a tagged union
//!   (record | sequence | atomic) so structural comparisons are total and
//!   type-preserving.

pub mod content;
pub mod entities;
pub mod errors;

pub use content::*;
pub use entities::*;
pub use errors::*;
