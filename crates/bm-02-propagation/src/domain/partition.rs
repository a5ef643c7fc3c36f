//! Network partition detection.
//!
//! Sets are compared by the Jaccard similarity of their belief-id sets and
//! grouped by average-link agglomerative clustering: the two clusters with
//! the highest mean cross-member similarity are merged while that mean is
//! at least the threshold. More than one final cluster means partitioned.

use bm_01_belief_model::BeliefSet;
use serde::{Deserialize, Serialize};
use shared_types::{AgentId, BeliefId};
use std::collections::BTreeSet;

pub const DEFAULT_PARTITION_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionReport {
    pub partitioned: bool,
    /// Member agents of each final cluster, in input order.
    pub clusters: Vec<Vec<AgentId>>,
}

impl PartitionReport {
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }
}

/// `|a ∩ b| / |a ∪ b|`; two empty sets are identical (1.0).
pub fn jaccard_similarity(a: &BTreeSet<BeliefId>, b: &BTreeSet<BeliefId>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

pub fn detect_partition<'a, I>(sets: I, threshold: f64) -> PartitionReport
where
    I: IntoIterator<Item = &'a BeliefSet>,
{
    let sets: Vec<&BeliefSet> = sets.into_iter().collect();
    let ids: Vec<BTreeSet<BeliefId>> = sets.iter().map(|s| s.ids()).collect();
    let n = sets.len();

    let mut similarity = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let s = jaccard_similarity(&ids[i], &ids[j]);
            similarity[i][j] = s;
            similarity[j][i] = s;
        }
    }

    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    while clusters.len() > 1 {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..clusters.len() {
            for j in i + 1..clusters.len() {
                let link = average_link(&clusters[i], &clusters[j], &similarity);
                if best.map_or(true, |(_, _, s)| link > s) {
                    best = Some((i, j, link));
                }
            }
        }

        match best {
            Some((i, j, link)) if link >= threshold => {
                let absorbed = clusters.remove(j);
                clusters[i].extend(absorbed);
                clusters[i].sort_unstable();
            }
            _ => break,
        }
    }

    let clusters: Vec<Vec<AgentId>> = clusters
        .into_iter()
        .map(|members| {
            members
                .into_iter()
                .map(|i| sets[i].agent_id().clone())
                .collect()
        })
        .collect();

    PartitionReport {
        partitioned: clusters.len() > 1,
        clusters,
    }
}

fn average_link(a: &[usize], b: &[usize], similarity: &[Vec<f64>]) -> f64 {
    let total: f64 = a
        .iter()
        .flat_map(|&i| b.iter().map(move |&j| similarity[i][j]))
        .sum();
    total / (a.len() * b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use bm_01_belief_model::{AtomOptions, BeliefAtom};
    use shared_types::BeliefContent;

    fn set(agent: &str, ids: &[&str]) -> BeliefSet {
        BeliefSet::from_atoms(
            AgentId::from(agent),
            ids.iter().map(|id| {
                BeliefAtom::create(
                    BeliefContent::symbol(*id),
                    AgentId::from(agent),
                    0.5,
                    AtomOptions::default().with_id(*id).at(1),
                )
            }),
        )
    }

    #[test]
    fn test_jaccard() {
        let a: BTreeSet<BeliefId> = ["x", "y"].into_iter().map(BeliefId::from).collect();
        let b: BTreeSet<BeliefId> = ["y", "z"].into_iter().map(BeliefId::from).collect();
        assert!((jaccard_similarity(&a, &b) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(jaccard_similarity(&BTreeSet::new(), &BTreeSet::new()), 1.0);
    }

    #[test]
    fn test_disjoint_sets_are_fully_partitioned() {
        let sets = vec![set("a", &["1"]), set("b", &["2"]), set("c", &["3"])];
        let report = detect_partition(&sets, DEFAULT_PARTITION_THRESHOLD);
        assert!(report.partitioned);
        assert_eq!(report.cluster_count(), 3);
        assert!(report.clusters.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_identical_sets_form_one_cluster() {
        let sets = vec![
            set("a", &["1", "2"]),
            set("b", &["1", "2"]),
            set("c", &["1", "2"]),
        ];
        let report = detect_partition(&sets, DEFAULT_PARTITION_THRESHOLD);
        assert!(!report.partitioned);
        assert_eq!(report.clusters, vec![vec![
            AgentId::from("a"),
            AgentId::from("b"),
            AgentId::from("c"),
        ]]);
    }

    #[test]
    fn test_two_islands() {
        let sets = vec![
            set("a", &["1", "2"]),
            set("b", &["7", "8"]),
            set("c", &["1", "2", "3"]),
            set("d", &["7", "8", "9"]),
        ];
        let report = detect_partition(&sets, DEFAULT_PARTITION_THRESHOLD);
        assert!(report.partitioned);
        assert_eq!(
            report.clusters,
            vec![
                vec![AgentId::from("a"), AgentId::from("c")],
                vec![AgentId::from("b"), AgentId::from("d")],
            ]
        );
    }

    #[test]
    fn test_small_groups() {
        let none: Vec<BeliefSet> = Vec::new();
        let report = detect_partition(&none, DEFAULT_PARTITION_THRESHOLD);
        assert!(!report.partitioned);
        assert!(report.clusters.is_empty());

        let one = vec![set("a", &["1"])];
        assert_eq!(detect_partition(&one, 0.3).cluster_count(), 1);
    }
}
