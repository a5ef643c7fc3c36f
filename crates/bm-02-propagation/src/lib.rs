//! # Belief Propagation Subsystem (bm-02)
//!
//! Moves belief atoms between agents and measures how far a group of belief
//! sets has converged.
//!
//! ## Architecture Role
//!
//! ```text
//! [Agent A] ──propagate(atom, targets, mode)──→ [Agent B] ──admit_update──→ accepted | rejected
//!                                         └──→ [Agent C] ──admit_update──→ accepted | rejected
//!
//! [Coordinator] ──verify_convergence(sets)──→ ConvergenceReport
//!               ──detect_partition(sets)───→ PartitionReport
//! ```
//!
//! ## Delivery Modes
//!
//! - **Async**: fire-and-forget, no delivery guarantee.
//! - **Sync**: per-target acknowledgement with an independent timeout; one
//!   slow or missing target never affects the others.
//!
//! There is no retry. Failures are reported per target in the outcome list.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

pub use domain::*;
pub use events::{PropagationError, UnknownPropagationMode};
pub use ports::inbound::PropagationApi;
pub use ports::outbound::{BeliefPeer, PeerRef};
pub use service::PropagationService;
