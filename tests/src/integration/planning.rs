//! # Planning Scenarios
//!
//! Batch layout, plan execution with and without early stop, and the
//! time-to-consistency estimator behind bounded consistency.

#[cfg(test)]
mod tests {
    use super::super::{atom, leader, set_of};
    use bm_01_belief_model::BeliefSet;
    use bm_02_propagation::verify_convergence;
    use bm_03_consistency::{
        create_plan, execute_plan, verify_bounded_consistency, BoundedConsistency,
        ConsistencyError, ConsistencyTracker, PlanOptions, PlanStatus,
    };
    use shared_types::{AgentId, BeliefContent};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn agents(n: usize) -> Vec<AgentId> {
        (1..=n).map(|i| AgentId::from(format!("a{i:02}"))).collect()
    }

    fn opinions(ids: &[AgentId]) -> BTreeMap<AgentId, BeliefSet> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                let confidence = 0.5 + i as f64 / 100.0;
                let set = set_of(
                    id.as_str(),
                    vec![atom(id.as_str(), "leader", leader(id.as_str()), confidence, 1)],
                );
                (id.clone(), set)
            })
            .collect()
    }

    fn immediate(batch_size: usize, early_stop: bool) -> PlanOptions {
        PlanOptions {
            batch_size,
            early_stop,
            time_scale: 0.0,
            ..PlanOptions::default()
        }
    }

    #[test]
    fn test_ten_agents_in_batches_of_three() {
        let plan = create_plan(&agents(10), immediate(3, false));
        assert_eq!(plan.batch_count, 4);
        let sizes: Vec<usize> = plan.batches.iter().map(|b| b.agents.len()).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
        assert!(plan
            .batches
            .windows(2)
            .all(|pair| pair[0].end_ms == pair[1].start_ms));
    }

    #[tokio::test]
    async fn test_presence_convergence_stops_plan_early() {
        let ids = agents(6);
        let plan = create_plan(&ids, immediate(2, true));
        let result = execute_plan(&plan, opinions(&ids)).await;

        assert_eq!(result.status, PlanStatus::EarlyStopped);
        let stop = result.early_stop.unwrap();
        assert_eq!(stop.batch_id, 0);
        assert_eq!(stop.skipped_batches, 2);
        assert_eq!(result.batches.len(), 1);
    }

    #[tokio::test]
    async fn test_full_plan_agrees_within_batches() {
        let ids = agents(6);
        let plan = create_plan(&ids, immediate(3, false));
        let result = execute_plan(&plan, opinions(&ids)).await;

        assert_eq!(result.status, PlanStatus::Completed);
        assert_eq!(result.batches.len(), 2);

        // Batches never mix, so each settles on its own most confident agent.
        let winner = |id: &str| {
            result.belief_sets[&AgentId::from(id)]
                .get(&"leader".into())
                .map(|atom| atom.content.clone())
        };
        assert_eq!(winner("a01"), Some(leader("a03")));
        assert_eq!(winner("a04"), Some(leader("a06")));

        let report = verify_convergence(result.belief_sets.values(), 1.0);
        assert_eq!(report.coverage, 1.0);
        assert!(report.content_agreement < 1.0);
    }

    fn tracker_with(samples: &[(f64, u64)]) -> ConsistencyTracker {
        let mut tracker = ConsistencyTracker::new();
        for (version, (score, at)) in samples.iter().enumerate() {
            tracker.record_convergence_check_at(*score, version as u64, *at);
        }
        tracker
    }

    fn split_population() -> Vec<BeliefSet> {
        vec![
            set_of("a", vec![atom("a", "x", BeliefContent::int(1), 0.9, 1)]),
            set_of("b", vec![atom("b", "y", BeliefContent::int(2), 0.9, 1)]),
        ]
    }

    #[test]
    fn test_bounded_consistency_projects_improvement() {
        let tracker = tracker_with(&[(0.5, 0), (0.6, 1_000), (0.7, 2_000)]);
        let sets = split_population();

        let within =
            verify_bounded_consistency(sets.iter(), &tracker, 0.95, Duration::from_secs(10));
        match within {
            Ok(BoundedConsistency::Achievable(estimate)) => {
                assert_eq!(estimate.steps, 3);
                assert!((estimate.seconds_per_step - 1.0).abs() < 1e-9);
            }
            other => panic!("expected an achievable estimate, got {other:?}"),
        }

        let too_slow =
            verify_bounded_consistency(sets.iter(), &tracker, 0.95, Duration::from_secs(1));
        assert!(matches!(
            too_slow,
            Err(ConsistencyError::ExceedsTimeBound { .. })
        ));
    }

    #[test]
    fn test_bounded_consistency_needs_progress() {
        let sets = split_population();

        let flat = tracker_with(&[(0.6, 0), (0.6, 1_000)]);
        assert!(matches!(
            verify_bounded_consistency(sets.iter(), &flat, 0.95, Duration::from_secs(60)),
            Err(ConsistencyError::NoImprovement { .. })
        ));

        let empty = ConsistencyTracker::new();
        assert_eq!(
            verify_bounded_consistency(sets.iter(), &empty, 0.95, Duration::from_secs(60)),
            Err(ConsistencyError::InsufficientData { points: 0 })
        );
    }
}
