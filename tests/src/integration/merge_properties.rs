//! # Merge Properties
//!
//! Idempotence and order-independence of set merging, plus the bounds of
//! the per-set consistency score.

#[cfg(test)]
mod tests {
    use super::super::{atom, leader, set_of};
    use bm_01_belief_model::{
        decode_set, encode_set, BeliefSet, ConflictResolver, ResolutionStrategy,
    };
    use shared_types::BeliefContent;

    fn opinionated_pair() -> (BeliefSet, BeliefSet) {
        let a = set_of(
            "a",
            vec![
                atom("a", "leader", leader("a"), 0.6, 1),
                atom("a", "load", BeliefContent::int(3), 0.4, 5),
                atom("a", "only-a", BeliefContent::symbol("x"), 0.9, 1),
            ],
        );
        let b = set_of(
            "b",
            vec![
                atom("b", "leader", leader("b"), 0.8, 2),
                atom("b", "load", BeliefContent::int(3), 0.7, 1),
                atom("b", "only-b", BeliefContent::symbol("y"), 0.2, 1),
            ],
        );
        (a, b)
    }

    // =========================================================================
    // IDEMPOTENCE
    // =========================================================================

    #[test]
    fn test_merge_twice_equals_merge_once() {
        let (a, b) = opinionated_pair();
        for strategy in [
            ResolutionStrategy::HighestConfidence,
            ResolutionStrategy::Newest,
            ResolutionStrategy::Authority,
        ] {
            let resolver = ConflictResolver::new(strategy);
            let once = a.merge(&b, &resolver);
            let twice = once.merge(&b, &resolver);
            assert_eq!(once, twice, "strategy {strategy}");
        }
    }

    #[test]
    fn test_second_merge_reports_no_change() {
        let (a, b) = opinionated_pair();
        let resolver = ConflictResolver::new(ResolutionStrategy::HighestConfidence);

        let (once, first) = a.merge_with_stats(&b, &resolver);
        assert_eq!(first.inserted, 1);
        assert_eq!(first.conflicts_resolved, 1);
        assert_eq!(first.replaced, 1);

        let (_, second) = once.merge_with_stats(&b, &resolver);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.replaced, 0);
    }

    // =========================================================================
    // COMMUTATIVITY
    // =========================================================================

    #[test]
    fn test_merge_commutes_without_conflicts() {
        let a = set_of(
            "a",
            vec![
                atom("a", "f1", BeliefContent::symbol("x"), 0.9, 1),
                atom("a", "shared", BeliefContent::text("sunny"), 0.3, 1),
            ],
        );
        let b = set_of(
            "b",
            vec![
                atom("b", "f2", BeliefContent::symbol("y"), 0.2, 1),
                atom("b", "shared", BeliefContent::text("sunny"), 0.8, 2),
            ],
        );
        let resolver = ConflictResolver::new(ResolutionStrategy::HighestConfidence);

        let ab = a.merge(&b, &resolver);
        let ba = b.merge(&a, &resolver);
        assert_eq!(ab.ids(), ba.ids());
        for id in ab.ids() {
            assert_eq!(ab.get(&id), ba.get(&id), "belief {id}");
        }
        assert_eq!(ab.agent_id().as_str(), "a");
        assert_eq!(ba.agent_id().as_str(), "b");
    }

    // =========================================================================
    // CONSISTENCY SCORE
    // =========================================================================

    #[test]
    fn test_consistency_score_bounds() {
        assert_eq!(set_of("a", vec![]).consistency_score(), 1.0);
        assert_eq!(
            set_of("a", vec![atom("a", "x", leader("a"), 0.5, 1)]).consistency_score(),
            1.0
        );

        let all_conflicting = set_of(
            "a",
            vec![
                atom("a", "x", leader("a"), 0.5, 1),
                atom("a", "y", leader("b"), 0.5, 1),
                atom("a", "z", leader("c"), 0.5, 1),
            ],
        );
        assert_eq!(all_conflicting.find_conflicts().len(), 3);
        assert_eq!(all_conflicting.consistency_score(), 0.0);
    }

    #[test]
    fn test_merged_set_survives_transport() {
        let (a, b) = opinionated_pair();
        let merged = a.merge(&b, &ConflictResolver::new(ResolutionStrategy::Merge));

        let bytes = encode_set(&merged).unwrap();
        assert_eq!(decode_set(&bytes).unwrap(), merged);
    }
}
