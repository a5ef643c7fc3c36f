//! # Population Wiring
//!
//! Spawning a population of agents, connecting neighbors, and the
//! [`Coordinator`] that runs whole-population operations over it.
//!
//! ```text
//!        ┌─────────────── Coordinator ───────────────┐
//!        │  collect → plan/align/verify → push back  │
//!        └──────┬──────────────┬──────────────┬──────┘
//!               ▼              ▼              ▼
//!           agent-1 ◄──────► agent-2 ◄──────► agent-3     neighbor sync
//!               │              │              │
//!               └──────────────┴──────┬───────┘
//!                                     ▼
//!                              InMemoryEventBus ──→ external consumers
//! ```

pub mod coordinator;

pub use coordinator::{AlignmentRun, ConsistencyRun, Coordinator, Snapshot, DEFAULT_COLLECT_TIMEOUT};

use shared_bus::InMemoryEventBus;
use shared_types::AgentId;
use std::sync::Arc;

use crate::agent::{spawn_agent, AgentHandle};
use crate::container::AgentConfig;
use crate::error::RuntimeError;

/// Spawns agents `agent-1` … `agent-n` sharing one configuration.
pub fn spawn_population(
    count: usize,
    config: &AgentConfig,
    bus: Option<Arc<InMemoryEventBus>>,
) -> Vec<AgentHandle> {
    (1..=count)
        .map(|i| spawn_agent(AgentId::from(format!("agent-{i}")), config.clone(), bus.clone()))
        .collect()
}

/// Makes every agent a neighbor of every other.
pub async fn connect_full_mesh(agents: &[AgentHandle]) -> Result<(), RuntimeError> {
    for agent in agents {
        let neighbors = agents
            .iter()
            .filter(|other| other.id() != agent.id())
            .cloned()
            .collect();
        agent.set_neighbors(neighbors).await?;
    }
    Ok(())
}

/// Connects each agent to its predecessor and successor in a ring.
pub async fn connect_ring(agents: &[AgentHandle]) -> Result<(), RuntimeError> {
    let n = agents.len();
    if n < 2 {
        return Ok(());
    }
    for (i, agent) in agents.iter().enumerate() {
        let next = agents[(i + 1) % n].clone();
        let previous = agents[(i + n - 1) % n].clone();
        let neighbors = if n == 2 { vec![next] } else { vec![previous, next] };
        agent.set_neighbors(neighbors).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bm_01_belief_model::AtomOptions;
    use shared_types::{BeliefContent, BeliefId};

    fn quiet() -> AgentConfig {
        AgentConfig {
            sync_interval: None,
            ..AgentConfig::default()
        }
    }

    #[tokio::test]
    async fn test_spawn_population_names_agents() {
        let agents = spawn_population(3, &quiet(), None);
        let ids: Vec<&str> = agents.iter().map(|agent| agent.id().as_str()).collect();
        assert_eq!(ids, vec!["agent-1", "agent-2", "agent-3"]);
    }

    #[tokio::test]
    async fn test_ring_sync_reaches_far_side() {
        let agents = spawn_population(4, &quiet(), None);
        connect_ring(&agents).await.unwrap();
        agents[0]
            .author_belief(
                BeliefContent::symbol("storm"),
                0.9,
                AtomOptions::default().with_id("weather"),
            )
            .await
            .unwrap();

        // agent-1 pushes to agent-2 and agent-4; agent-2 then reaches agent-3.
        agents[0].sync_now().await.unwrap();
        agents[1].sync_now().await.unwrap();

        for agent in &agents {
            assert!(agent
                .belief(&BeliefId::from("weather"))
                .await
                .unwrap()
                .is_some());
        }
    }

    #[tokio::test]
    async fn test_full_mesh_excludes_self() {
        let agents = spawn_population(3, &quiet(), None);
        connect_full_mesh(&agents).await.unwrap();
        agents[2]
            .author_belief(BeliefContent::int(7), 0.8, AtomOptions::default().with_id("n"))
            .await
            .unwrap();

        let outcomes = agents[2].sync_now().await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|outcome| outcome.result.is_ok()));
    }
}
