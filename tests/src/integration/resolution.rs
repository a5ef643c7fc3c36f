//! # Resolution Strategies
//!
//! The probabilistic strategy is checked by sampled frequency; the
//! deterministic ones by their tie-breaking rules.

#[cfg(test)]
mod tests {
    use super::super::{atom, leader};
    use bm_01_belief_model::{ConflictResolver, ResolutionStrategy};
    use shared_types::AgentId;
    use std::collections::HashMap;

    /// Chi-square critical value, one degree of freedom, p = 0.001.
    const CHI_SQUARE_CRITICAL: f64 = 10.828;

    #[test]
    fn test_probabilistic_frequency_matches_confidence_ratio() {
        let a = atom("a", "leader", leader("a"), 0.75, 1);
        let b = atom("b", "leader", leader("b"), 0.25, 1);
        let resolver = ConflictResolver::seeded(ResolutionStrategy::Probabilistic, 7);

        let draws = 4_000;
        let picked_a = (0..draws)
            .filter(|_| resolver.resolve(&a, &b).source == a.source)
            .count() as f64;

        let expected_a = draws as f64 * 0.75;
        let expected_b = draws as f64 * 0.25;
        let picked_b = draws as f64 - picked_a;
        let chi_square = (picked_a - expected_a).powi(2) / expected_a
            + (picked_b - expected_b).powi(2) / expected_b;
        assert!(
            chi_square < CHI_SQUARE_CRITICAL,
            "chi-square {chi_square} for {picked_a}/{draws}"
        );
    }

    #[test]
    fn test_seeded_resolvers_repeat_their_choices() {
        let a = atom("a", "leader", leader("a"), 0.5, 1);
        let b = atom("b", "leader", leader("b"), 0.5, 1);
        let first = ConflictResolver::seeded(ResolutionStrategy::Probabilistic, 42);
        let second = ConflictResolver::seeded(ResolutionStrategy::Probabilistic, 42);

        for _ in 0..50 {
            assert_eq!(first.resolve(&a, &b), second.resolve(&a, &b));
        }
    }

    #[test]
    fn test_tie_breaking() {
        let a = atom("a", "leader", leader("a"), 0.5, 3);
        let b = atom("b", "leader", leader("b"), 0.5, 3);

        let highest = ConflictResolver::new(ResolutionStrategy::HighestConfidence);
        assert_eq!(highest.resolve(&a, &b), a);

        let newest = ConflictResolver::new(ResolutionStrategy::Newest);
        assert_eq!(newest.resolve(&a, &b), b);

        let unranked = ConflictResolver::new(ResolutionStrategy::Authority);
        assert_eq!(unranked.resolve(&a, &b), a);

        let ranked = ConflictResolver::new(ResolutionStrategy::Authority)
            .with_authority(HashMap::from([(AgentId::from("b"), 2)]));
        assert_eq!(ranked.resolve(&a, &b), b);
    }

    #[test]
    fn test_unknown_strategy_name_falls_back() {
        assert_eq!(
            ResolutionStrategy::from_name("majority_vote"),
            ResolutionStrategy::HighestConfidence
        );
        assert_eq!(
            ResolutionStrategy::from_name("newest"),
            ResolutionStrategy::Newest
        );
    }
}
