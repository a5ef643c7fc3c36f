//! Composite consistency audit.

use bm_01_belief_model::{BeliefSet, ConflictPair, ConflictResolver};
use bm_02_propagation::{
    detect_partition, verify_convergence, ConvergenceReport, PartitionReport,
    DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_PARTITION_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use shared_types::AgentId;
use std::collections::BTreeMap;

use super::{alignment_score, construct_global_state, GlobalStateOptions};
use crate::events::ConsistencyError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOptions {
    pub consistency_threshold: f64,
    pub alignment_threshold: f64,
    pub partition_threshold: f64,
    pub global: GlobalStateOptions,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            consistency_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            alignment_threshold: 0.9,
            partition_threshold: DEFAULT_PARTITION_THRESHOLD,
            global: GlobalStateOptions::default(),
        }
    }
}

/// Remediation hint for a failed sub-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    /// The global state still contains conflicting beliefs.
    ResolveConflicts,
    /// Agents have drifted into separate clusters.
    MitigatePartition,
    /// Belief coverage is below the consistency threshold.
    TunePropagation,
    /// Local sets diverge from the global state.
    StrengthenEnforcement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub consistent: bool,
    pub global_conflicts: Vec<ConflictPair>,
    pub partition: PartitionReport,
    pub convergence: ConvergenceReport,
    pub alignment_scores: BTreeMap<AgentId, f64>,
    pub mean_alignment: f64,
    pub recommendations: Vec<Recommendation>,
}

/// Audits the population.
///
/// Consistent iff the global state is conflict-free, coverage reaches the
/// consistency threshold and mean alignment reaches the alignment threshold.
pub fn verify(
    sets: &BTreeMap<AgentId, BeliefSet>,
    options: &VerificationOptions,
) -> Result<VerificationReport, ConsistencyError> {
    let resolver = ConflictResolver::new(options.global.conflict_strategy);
    let global = construct_global_state(sets.values(), &resolver, options.global.confidence_threshold)?;

    let global_conflicts = global.find_conflicts();
    let partition = detect_partition(sets.values(), options.partition_threshold);
    let convergence = verify_convergence(sets.values(), options.consistency_threshold);

    let alignment_scores: BTreeMap<AgentId, f64> = sets
        .iter()
        .map(|(agent, set)| (agent.clone(), alignment_score(set, &global)))
        .collect();
    let mean_alignment = if alignment_scores.is_empty() {
        1.0
    } else {
        alignment_scores.values().sum::<f64>() / alignment_scores.len() as f64
    };

    let mut recommendations = Vec::new();
    if !global_conflicts.is_empty() {
        recommendations.push(Recommendation::ResolveConflicts);
    }
    if partition.partitioned {
        recommendations.push(Recommendation::MitigatePartition);
    }
    if !convergence.converged {
        recommendations.push(Recommendation::TunePropagation);
    }
    let aligned = mean_alignment >= options.alignment_threshold;
    if !aligned {
        recommendations.push(Recommendation::StrengthenEnforcement);
    }

    Ok(VerificationReport {
        consistent: global_conflicts.is_empty() && convergence.converged && aligned,
        global_conflicts,
        partition,
        convergence,
        alignment_scores,
        mean_alignment,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bm_01_belief_model::{AtomOptions, BeliefAtom};
    use shared_types::BeliefContent;

    fn atom(agent: &str, id: &str, content: BeliefContent, confidence: f64) -> BeliefAtom {
        BeliefAtom::create(
            content,
            AgentId::from(agent),
            confidence,
            AtomOptions::default().with_id(id).at(1),
        )
    }

    fn population(entries: Vec<(&str, Vec<BeliefAtom>)>) -> BTreeMap<AgentId, BeliefSet> {
        entries
            .into_iter()
            .map(|(agent, atoms)| {
                (
                    AgentId::from(agent),
                    BeliefSet::from_atoms(AgentId::from(agent), atoms),
                )
            })
            .collect()
    }

    #[test]
    fn test_agreeing_population_is_consistent() {
        let sets = population(vec![
            ("a", vec![atom("a", "weather", BeliefContent::symbol("sunny"), 0.9)]),
            ("b", vec![atom("b", "weather", BeliefContent::symbol("sunny"), 0.8)]),
        ]);
        let report = verify(&sets, &VerificationOptions::default()).unwrap();
        assert!(report.consistent);
        assert!(report.recommendations.is_empty());
        assert_eq!(report.mean_alignment, 1.0);
    }

    #[test]
    fn test_disjoint_population_gets_recommendations() {
        let sets = population(vec![
            ("a", vec![atom("a", "x", BeliefContent::symbol("one"), 0.9)]),
            ("b", vec![atom("b", "y", BeliefContent::symbol("two"), 0.9)]),
        ]);
        let report = verify(&sets, &VerificationOptions::default()).unwrap();

        assert!(!report.consistent);
        // Two leaf symbols share a shape, so the global set holds a conflict.
        assert_eq!(report.global_conflicts.len(), 1);
        assert!(report.partition.partitioned);
        assert_eq!(
            report.recommendations,
            vec![
                Recommendation::ResolveConflicts,
                Recommendation::MitigatePartition,
                Recommendation::TunePropagation,
                Recommendation::StrengthenEnforcement,
            ]
        );
        assert_eq!(report.mean_alignment, 0.5);
    }

    #[test]
    fn test_empty_population() {
        let report = verify(&BTreeMap::new(), &VerificationOptions::default()).unwrap();
        assert!(report.consistent);
        assert!(!report.partition.partitioned);
    }
}
