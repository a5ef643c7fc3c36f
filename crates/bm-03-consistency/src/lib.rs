//! # Consistency Management Subsystem (bm-03)
//!
//! Drives a population of belief sets toward eventual consistency within a
//! time budget, and audits how close it is.
//!
//! ## Architecture Role
//!
//! ```text
//!                      ┌──────────────────────────┐
//!   agent sets ──────→ │ create_plan / execute    │──→ PlanResult (synced sets)
//!                      │ construct_global_state   │──→ global BeliefSet
//!                      │ align (enforcement)      │──→ AlignmentSummary
//!                      │ verify                   │──→ VerificationReport
//!                      └────────────┬─────────────┘
//!                                   ↓ record_convergence_check
//!                          ConsistencyTracker (single owner)
//! ```
//!
//! The tracker is not internally synchronised. A runtime sharing it
//! between callers wraps it in a lock.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod events;
pub mod service;

pub use domain::*;
pub use events::ConsistencyError;
pub use service::{execute_plan, execute_plan_with, BatchRecord, EarlyStop, PlanResult, PlanStatus};
