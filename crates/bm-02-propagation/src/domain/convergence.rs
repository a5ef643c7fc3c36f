//! Convergence measurement over a group of belief sets.
//!
//! `coverage` is presence-based: the fraction of (set × id) slots filled
//! over the union of ids. Two sets holding the same id with different
//! content still count as covering it. `content_agreement` is the stricter
//! companion: the fraction of ids whose content is identical in every set
//! that holds them. Only `coverage` decides `converged`.

use bm_01_belief_model::BeliefSet;
use serde::{Deserialize, Serialize};
use shared_types::{BeliefContent, BeliefId};
use std::collections::BTreeMap;

pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub converged: bool,
    pub coverage: f64,
    pub content_agreement: f64,
    pub set_count: usize,
    pub distinct_ids: usize,
}

impl ConvergenceReport {
    fn trivial(set_count: usize, distinct_ids: usize) -> Self {
        Self {
            converged: true,
            coverage: 1.0,
            content_agreement: 1.0,
            set_count,
            distinct_ids,
        }
    }
}

/// Measures convergence of `sets`; converged iff `coverage >= threshold`.
///
/// Zero or one set is trivially converged, as is a group of empty sets.
pub fn verify_convergence<'a, I>(sets: I, threshold: f64) -> ConvergenceReport
where
    I: IntoIterator<Item = &'a BeliefSet>,
{
    let sets: Vec<&BeliefSet> = sets.into_iter().collect();
    let n = sets.len();

    let mut holders: BTreeMap<&BeliefId, Vec<&BeliefContent>> = BTreeMap::new();
    for set in &sets {
        for atom in set.atoms() {
            holders.entry(&atom.id).or_default().push(&atom.content);
        }
    }
    let distinct = holders.len();

    if n <= 1 || distinct == 0 {
        return ConvergenceReport::trivial(n, distinct);
    }

    let filled: usize = holders.values().map(Vec::len).sum();
    let coverage = filled as f64 / (n * distinct) as f64;

    let agreeing = holders
        .values()
        .filter(|contents| contents.windows(2).all(|w| w[0] == w[1]))
        .count();
    let content_agreement = agreeing as f64 / distinct as f64;

    ConvergenceReport {
        converged: coverage >= threshold,
        coverage,
        content_agreement,
        set_count: n,
        distinct_ids: distinct,
    }
}
