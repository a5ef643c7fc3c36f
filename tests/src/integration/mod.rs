//! # Integration Scenarios
//!
//! Each module exercises one property across the belief model,
//! propagation, consistency and runtime crates together.

pub mod admission;
pub mod convergence;
pub mod merge_properties;
pub mod planning;
pub mod resolution;
pub mod runtime;

use bm_01_belief_model::{AtomOptions, BeliefAtom, BeliefSet};
use shared_types::{AgentId, BeliefContent, Timestamp};

/// `("leader", value)` tuple; any two differing values conflict.
pub fn leader(value: &str) -> BeliefContent {
    BeliefContent::tuple([BeliefContent::symbol("leader"), BeliefContent::symbol(value)])
}

/// Atom with a fixed id and timestamp.
pub fn atom(
    source: &str,
    id: &str,
    content: BeliefContent,
    confidence: f64,
    timestamp: Timestamp,
) -> BeliefAtom {
    BeliefAtom::create(
        content,
        AgentId::from(source),
        confidence,
        AtomOptions::default().with_id(id).at(timestamp),
    )
}

pub fn set_of(agent: &str, atoms: Vec<BeliefAtom>) -> BeliefSet {
    BeliefSet::from_atoms(AgentId::from(agent), atoms)
}
