//! # Runtime End to End
//!
//! Agents as actors: neighbor sync, mutual sync, isolated propagation
//! failures and a coordinator-driven consistency run.

#[cfg(test)]
mod tests {
    use super::super::leader;
    use agent_runtime::{
        connect_full_mesh, connect_ring, spawn_agent, spawn_population, AgentConfig,
        AgentHandle, Coordinator, PropagateRequest,
    };
    use async_trait::async_trait;
    use bm_01_belief_model::{AtomOptions, BeliefAtom};
    use bm_02_propagation::{
        verify_convergence, AdmissionDecision, BeliefPeer, DeliveryStatus, PropagationError,
        PropagationMode,
    };
    use bm_03_consistency::{PlanOptions, PlanStatus, VerificationOptions};
    use shared_bus::{BeliefEvent, EventFilter, EventTopic, InMemoryEventBus};
    use shared_types::{AgentId, BeliefId};
    use std::sync::Arc;
    use std::time::Duration;

    fn quiet() -> AgentConfig {
        AgentConfig {
            sync_interval: None,
            ..AgentConfig::default()
        }
    }

    fn claim() -> AtomOptions {
        AtomOptions::default().with_id("leader").at(1)
    }

    async fn claimants(confidences: &[f64]) -> Vec<AgentHandle> {
        let agents = spawn_population(confidences.len(), &quiet(), None);
        for (agent, confidence) in agents.iter().zip(confidences) {
            agent
                .author_belief(leader(agent.id().as_str()), *confidence, claim())
                .await
                .unwrap();
        }
        agents
    }

    async fn snapshot(agents: &[AgentHandle]) -> Vec<bm_01_belief_model::BeliefSet> {
        let mut sets = Vec::new();
        for agent in agents {
            sets.push(agent.belief_set().await.unwrap());
        }
        sets
    }

    /// Peer whose mailbox is gone.
    struct DeadPeer(AgentId);

    #[async_trait]
    impl BeliefPeer for DeadPeer {
        fn agent_id(&self) -> &AgentId {
            &self.0
        }

        async fn deliver(&self, _atom: BeliefAtom, _from: AgentId) -> Result<(), PropagationError> {
            Err(PropagationError::Unreachable(self.0.clone()))
        }

        async fn deliver_with_ack(
            &self,
            _atom: BeliefAtom,
            _from: AgentId,
        ) -> Result<AdmissionDecision, PropagationError> {
            Err(PropagationError::Unreachable(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn test_full_mesh_sync_converges_on_most_confident() {
        let agents = claimants(&[0.9, 0.5, 0.5]).await;
        connect_full_mesh(&agents).await.unwrap();

        for agent in &agents {
            let outcomes = agent.sync_now().await.unwrap();
            assert!(outcomes.iter().all(|outcome| outcome.result.is_ok()));
        }

        let sets = snapshot(&agents).await;
        for set in &sets {
            assert_eq!(
                set.get(&BeliefId::from("leader")).unwrap().content,
                leader("agent-1")
            );
        }
        let report = verify_convergence(sets.iter(), 1.0);
        assert_eq!(report.coverage, 1.0);
        assert_eq!(report.content_agreement, 1.0);
    }

    #[tokio::test]
    async fn test_mutual_sync_completes() {
        let agents = claimants(&[0.4, 0.8]).await;
        let (a, b) = (&agents[0], &agents[1]);

        let (left, right) = tokio::time::timeout(
            Duration::from_secs(5),
            futures::future::join(a.sync_with(b), b.sync_with(a)),
        )
        .await
        .unwrap();
        assert!(left.is_ok());
        assert!(right.is_ok());

        for set in snapshot(&agents).await {
            assert_eq!(
                set.get(&BeliefId::from("leader")).unwrap().content,
                leader("agent-2")
            );
        }
    }

    #[tokio::test]
    async fn test_unreachable_target_does_not_abort_propagation() {
        let agents = claimants(&[0.9]).await;
        let listener = spawn_agent(AgentId::from("listener"), quiet(), None);
        let dead: Arc<dyn BeliefPeer> = Arc::new(DeadPeer(AgentId::from("dead")));

        for mode in [PropagationMode::Sync, PropagationMode::Async] {
            let outcomes = agents[0]
                .propagate(
                    &BeliefId::from("leader"),
                    PropagateRequest::to(vec![dead.clone(), listener.as_peer()]).mode(mode),
                )
                .await
                .unwrap();
            assert_eq!(
                outcomes[0].status,
                DeliveryStatus::Failed(PropagationError::Unreachable(AgentId::from("dead")))
            );
            assert!(!outcomes[1].is_failure());
        }

        let metrics = listener.metrics().await.unwrap();
        assert_eq!(metrics.updates_received, 2);
        assert_eq!(metrics.updates_accepted, 1);
    }

    #[tokio::test]
    async fn test_ring_reaches_everyone_after_enough_rounds() {
        let agents = claimants(&[0.3, 0.3, 0.3, 0.3, 0.3, 0.95]).await;
        connect_ring(&agents).await.unwrap();

        for _ in 0..3 {
            for agent in &agents {
                agent.sync_now().await.unwrap();
            }
        }
        for set in snapshot(&agents).await {
            assert_eq!(
                set.get(&BeliefId::from("leader")).unwrap().content,
                leader("agent-6")
            );
        }
    }

    #[tokio::test]
    async fn test_coordinator_run_publishes_and_verifies() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut events = bus.subscribe(EventFilter::topics(vec![EventTopic::Consistency]));
        let coordinator = Coordinator::new(Some(bus.clone()));
        let confidences: Vec<f64> = (1..=10).map(|i| i as f64 / 10.0).collect();
        let agents = claimants(&confidences).await;

        let run = coordinator
            .ensure_consistency(
                &agents,
                PlanOptions {
                    batch_size: 3,
                    early_stop: false,
                    time_scale: 0.0,
                    ..PlanOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(run.plan.batch_count, 4);
        assert_eq!(run.result.status, PlanStatus::Completed);
        assert_eq!(run.result.batches.len(), 4);
        assert_eq!(run.convergence.coverage, 1.0);

        let verdict = coordinator
            .verify_consistency(&agents, &VerificationOptions::default())
            .await
            .unwrap();
        assert!(!verdict.partition.partitioned);
        assert_eq!(verdict.convergence.coverage, 1.0);

        assert!(matches!(
            events.recv().await,
            Some(BeliefEvent::PlanCompleted {
                batches_run: 4,
                failed: false,
                ..
            })
        ));
        let versions: Vec<u64> = [events.recv().await, events.recv().await]
            .into_iter()
            .filter_map(|event| match event {
                Some(BeliefEvent::ConvergenceChecked { global_version, .. }) => {
                    Some(global_version)
                }
                _ => None,
            })
            .collect();
        assert_eq!(versions, vec![1, 1]);
        assert_eq!(coordinator.tracker().history_len(), 2);
    }
}
