//! # Agent Runtime
//!
//! Hosts Belief-Mesh agents as tokio actors and coordinates
//! whole-population consistency work.
//!
//! ## Modular Structure
//!
//! - `agent/` - Actor task, mailbox messages and the cloneable handle
//! - `container/` - Agent and binary configuration
//! - `wiring/` - Population spawning, topology and the coordinator
//! - `error` - [`RuntimeError`]
//!
//! ## Architecture
//!
//! ```text
//!   AgentHandle ──mpsc──→ AgentActor (owns BeliefSet)
//!        │                    │
//!        │                    ├── bm-02 admission / propagation
//!        │                    └── shared-bus events
//!        ▼
//!   Coordinator ── bm-03 plan / align / verify ── ConsistencyTracker
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let agents = spawn_population(5, &AgentConfig::default(), None);
//! connect_full_mesh(&agents).await?;
//! let coordinator = Coordinator::default();
//! let run = coordinator.ensure_consistency(&agents, PlanOptions::default()).await?;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod agent;
pub mod container;
pub mod error;
pub mod wiring;

pub use agent::{
    spawn_agent, spawn_agent_with, AgentHandle, AgentMetrics, AgentState, PropagateRequest,
    SyncOutcome, SyncReport,
};
pub use container::{AgentConfig, AgentConfigUpdate, ConfigError, RuntimeConfig};
pub use error::RuntimeError;
pub use wiring::{
    connect_full_mesh, connect_ring, spawn_population, AlignmentRun, ConsistencyRun, Coordinator,
    Snapshot,
};
