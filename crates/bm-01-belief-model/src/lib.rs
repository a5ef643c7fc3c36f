//! # Belief Model Subsystem (bm-01)
//!
//! The data layer every other subsystem builds on.
//!
//! ## Architecture Role
//!
//! ```text
//!   BeliefAtom ──compose──→ BeliefSet ──merge/resolve──→ BeliefSet
//!        │                      │
//!        └──uncertainty──┐      └──find_conflicts / consistency_score
//!                        ↓
//!               aggregate / agree
//! ```
//!
//! - **Atoms** are immutable value objects; every "update" yields a new atom.
//! - **Sets** are owned by exactly one agent and keyed by atom id.
//! - **Conflicts** are structural: same content shape, different value.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod codec;
pub mod domain;

pub use codec::{decode_atom, decode_set, encode_atom, encode_set, CodecError};
pub use domain::*;
