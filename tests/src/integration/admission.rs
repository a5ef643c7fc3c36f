//! # Admission Ordering
//!
//! Inbound updates applied one after another, as an agent's mailbox would.

#[cfg(test)]
mod tests {
    use super::super::{atom, leader, set_of};
    use bm_01_belief_model::{BeliefAtom, BeliefSet, ConflictResolver, ResolutionStrategy};
    use bm_02_propagation::{admit_update, AdmissionDecision, RejectionReason};
    use shared_types::{BeliefContent, BeliefId};

    fn apply(
        updates: &[BeliefAtom],
        resolver: &ConflictResolver,
    ) -> (BeliefSet, Vec<AdmissionDecision>) {
        let mut local = set_of("local", vec![]);
        let mut decisions = Vec::new();
        for update in updates {
            let (next, decision) = admit_update(update, &local, 0.5, resolver);
            local = next;
            decisions.push(decision);
        }
        (local, decisions)
    }

    #[test]
    fn test_less_confident_newer_update_is_rejected() {
        let reading = BeliefContent::text("door open");
        let b1 = atom("s", "door", reading.clone(), 0.6, 1);
        let b2 = atom("s", "door", reading, 0.5, 2);

        let (local, decisions) = apply(&[b1.clone(), b2], &ConflictResolver::default());
        assert!(decisions[0].is_accepted());
        assert_eq!(
            decisions[1],
            AdmissionDecision::Rejected(RejectionReason::NotMoreConfident {
                incoming: 0.5,
                held: 0.6,
            })
        );
        assert_eq!(local.get(&BeliefId::from("door")), Some(&b1));
    }

    #[test]
    fn test_older_update_after_newer_is_stale() {
        let reading = BeliefContent::text("door open");
        let newer = atom("s", "door", reading.clone(), 0.5, 2);
        let older = atom("s", "door", reading, 0.9, 1);

        let (_, decisions) = apply(&[newer, older], &ConflictResolver::default());
        assert_eq!(
            decisions[1],
            AdmissionDecision::Rejected(RejectionReason::Stale {
                incoming: 1,
                held: 2,
            })
        );
    }

    #[test]
    fn test_newer_conflicting_update_goes_through_resolver() {
        let held = atom("a", "leader", leader("a"), 0.9, 1);
        let challenger = atom("b", "leader", leader("b"), 0.6, 2);

        let (kept, decisions) = apply(
            &[held.clone(), challenger.clone()],
            &ConflictResolver::new(ResolutionStrategy::HighestConfidence),
        );
        assert!(decisions[1].conflict_resolved());
        assert_eq!(kept.get(&BeliefId::from("leader")), Some(&held));

        let (replaced, _) = apply(
            &[held, challenger.clone()],
            &ConflictResolver::new(ResolutionStrategy::Newest),
        );
        assert_eq!(replaced.get(&BeliefId::from("leader")), Some(&challenger));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let (local, decisions) = apply(
            &[
                atom("s", "at", BeliefContent::bool(true), 0.5, 1),
                atom("s", "below", BeliefContent::bool(true), 0.49, 1),
            ],
            &ConflictResolver::default(),
        );
        assert!(decisions[0].is_accepted());
        assert!(!decisions[1].is_accepted());
        assert_eq!(local.len(), 1);
    }
}
