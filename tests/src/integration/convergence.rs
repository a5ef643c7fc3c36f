//! # Convergence Scenarios
//!
//! All-pairs synchronisation of a small population, coverage monotonicity
//! and the two extremes of partition detection.

#[cfg(test)]
mod tests {
    use super::super::{atom, leader, set_of};
    use bm_01_belief_model::{BeliefSet, ConflictResolver, ResolutionStrategy};
    use bm_02_propagation::{
        detect_partition, verify_convergence, DEFAULT_CONVERGENCE_THRESHOLD,
        DEFAULT_PARTITION_THRESHOLD,
    };
    use bm_03_consistency::synchronize_beliefs;
    use shared_types::{AgentId, BeliefContent, BeliefId};
    use std::collections::BTreeMap;

    fn population(sets: Vec<BeliefSet>) -> BTreeMap<AgentId, BeliefSet> {
        sets.into_iter()
            .map(|set| (set.agent_id().clone(), set))
            .collect()
    }

    #[test]
    fn test_three_agents_converge_on_most_confident_leader() {
        let mut sets = population(vec![
            set_of("A", vec![atom("A", "leader", leader("A"), 0.9, 1)]),
            set_of("B", vec![atom("B", "leader", leader("B"), 0.5, 1)]),
            set_of("C", vec![atom("C", "leader", leader("C"), 0.5, 1)]),
        ]);
        let agents: Vec<AgentId> = sets.keys().cloned().collect();
        let resolver = ConflictResolver::new(ResolutionStrategy::HighestConfidence);

        let stats = synchronize_beliefs(&mut sets, &agents, &resolver).unwrap();
        assert_eq!(stats.pairs, 3);

        for set in sets.values() {
            assert_eq!(
                set.get(&BeliefId::from("leader")).unwrap().content,
                leader("A"),
                "agent {}",
                set.agent_id()
            );
        }
        let report = verify_convergence(sets.values(), DEFAULT_CONVERGENCE_THRESHOLD);
        assert!(report.converged);
        assert_eq!(report.coverage, 1.0);
        assert_eq!(report.content_agreement, 1.0);
    }

    #[test]
    fn test_presence_coverage_ignores_content() {
        let sets = [
            set_of("A", vec![atom("A", "leader", leader("A"), 0.9, 1)]),
            set_of("B", vec![atom("B", "leader", leader("B"), 0.5, 1)]),
        ];
        let report = verify_convergence(sets.iter(), DEFAULT_CONVERGENCE_THRESHOLD);
        assert!(report.converged);
        assert_eq!(report.content_agreement, 0.0);
    }

    #[test]
    fn test_coverage_never_drops_when_sharing_more() {
        let shared = atom("A", "x", BeliefContent::int(1), 0.8, 1);
        let mut sets = vec![
            set_of("A", vec![shared.clone()]),
            set_of("B", vec![atom("B", "y", BeliefContent::int(2), 0.8, 1)]),
            set_of("C", vec![]),
            set_of("D", vec![]),
        ];

        let mut previous = verify_convergence(sets.iter(), 1.0).coverage;
        for i in 1..sets.len() {
            sets[i].upsert(shared.clone());
            let coverage = verify_convergence(sets.iter(), 1.0).coverage;
            assert!(coverage >= previous, "{coverage} < {previous} after agent {i}");
            previous = coverage;
        }
        assert_eq!(previous, 5.0 / 8.0);
    }

    #[test]
    fn test_disjoint_sets_fully_partitioned() {
        let sets: Vec<BeliefSet> = (0..4)
            .map(|i| {
                let agent = format!("agent-{i}");
                set_of(
                    &agent,
                    vec![atom(&agent, &format!("private-{i}"), BeliefContent::int(i), 0.9, 1)],
                )
            })
            .collect();

        let report = detect_partition(sets.iter(), DEFAULT_PARTITION_THRESHOLD);
        assert!(report.partitioned);
        assert_eq!(report.cluster_count(), 4);
        assert!(report.clusters.iter().all(|cluster| cluster.len() == 1));
    }

    #[test]
    fn test_identical_id_sets_form_one_cluster() {
        let sets: Vec<BeliefSet> = ["a", "b", "c"]
            .iter()
            .map(|agent| {
                set_of(
                    agent,
                    vec![
                        atom(agent, "x", BeliefContent::symbol(*agent), 0.9, 1),
                        atom(agent, "y", BeliefContent::int(0), 0.9, 1),
                    ],
                )
            })
            .collect();

        let report = detect_partition(sets.iter(), DEFAULT_PARTITION_THRESHOLD);
        assert!(!report.partitioned);
        assert_eq!(report.cluster_count(), 1);
    }

    #[test]
    fn test_trivial_groups_converged() {
        let empty: Vec<BeliefSet> = Vec::new();
        assert_eq!(verify_convergence(empty.iter(), 1.0).coverage, 1.0);

        let single = [set_of("a", vec![atom("a", "x", BeliefContent::null(), 0.1, 1)])];
        assert!(verify_convergence(single.iter(), 1.0).converged);
    }
}
