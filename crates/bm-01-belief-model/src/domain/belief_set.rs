//! # Belief Sets
//!
//! An agent's owned collection of belief atoms, keyed by atom id.
//!
//! ## Invariants
//!
//! - Every key equals the `id` of the atom stored under it.
//! - `last_updated` is bumped on every structural change.
//! - A set is owned by one agent; merges return a new set that keeps the
//!   target's agent identity.

use serde::{Deserialize, Serialize};
use shared_types::{now_ms, AgentId, BeliefContent, BeliefId, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

use super::{are_conflicting, contents_conflict, BeliefAtom, ConflictPair, ConflictResolver};

/// Counters describing what a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub conflicts_resolved: usize,
    pub replaced: usize,
}

impl MergeStats {
    pub fn changed(&self) -> bool {
        self.inserted + self.conflicts_resolved + self.replaced > 0
    }
}

/// A per-agent collection of belief atoms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeliefSet {
    agent_id: AgentId,
    beliefs: BTreeMap<BeliefId, BeliefAtom>,
    pub metadata: BTreeMap<String, BeliefContent>,
    last_updated: Timestamp,
}

impl BeliefSet {
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            beliefs: BTreeMap::new(),
            metadata: BTreeMap::new(),
            last_updated: now_ms(),
        }
    }

    /// Builds a set from atoms; later atoms with a repeated id win.
    pub fn from_atoms(agent_id: AgentId, atoms: impl IntoIterator<Item = BeliefAtom>) -> Self {
        let mut set = Self::new(agent_id);
        for atom in atoms {
            set.upsert(atom);
        }
        set
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn last_updated(&self) -> Timestamp {
        self.last_updated
    }

    /// Same beliefs under a different owner.
    pub fn relabeled(&self, agent_id: AgentId) -> Self {
        Self {
            agent_id,
            ..self.clone()
        }
    }

    /// Inserts or replaces the atom stored under its id.
    pub fn upsert(&mut self, atom: BeliefAtom) {
        self.beliefs.insert(atom.id.clone(), atom);
        self.touch();
    }

    /// Removes an atom; a missing id is a no-op.
    pub fn remove(&mut self, id: &BeliefId) -> Option<BeliefAtom> {
        let removed = self.beliefs.remove(id);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn get(&self, id: &BeliefId) -> Option<&BeliefAtom> {
        self.beliefs.get(id)
    }

    pub fn contains(&self, id: &BeliefId) -> bool {
        self.beliefs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.beliefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beliefs.is_empty()
    }

    pub fn atoms(&self) -> impl Iterator<Item = &BeliefAtom> {
        self.beliefs.values()
    }

    pub fn ids(&self) -> BTreeSet<BeliefId> {
        self.beliefs.keys().cloned().collect()
    }

    /// Atoms matching a predicate, in id order.
    pub fn filter<F>(&self, predicate: F) -> Vec<BeliefAtom>
    where
        F: Fn(&BeliefAtom) -> bool,
    {
        self.beliefs
            .values()
            .filter(|atom| predicate(atom))
            .cloned()
            .collect()
    }

    /// All conflicting pairs. Quadratic pairwise scan.
    pub fn find_conflicts(&self) -> Vec<ConflictPair> {
        let atoms: Vec<&BeliefAtom> = self.beliefs.values().collect();
        let mut conflicts = Vec::new();
        for (i, a) in atoms.iter().enumerate() {
            for b in &atoms[i + 1..] {
                if are_conflicting(a, b) {
                    conflicts.push(ConflictPair::new(a.id.clone(), b.id.clone()));
                }
            }
        }
        conflicts
    }

    /// `1 - conflicts / C(n, 2)`; sets with fewer than two atoms score `1.0`.
    pub fn consistency_score(&self) -> f64 {
        let n = self.beliefs.len();
        if n <= 1 {
            return 1.0;
        }
        let pairs = (n * (n - 1) / 2) as f64;
        1.0 - self.find_conflicts().len() as f64 / pairs
    }

    /// Merges `source` into a copy of this set.
    pub fn merge(&self, source: &BeliefSet, resolver: &ConflictResolver) -> BeliefSet {
        self.merge_with_stats(source, resolver).0
    }

    /// Merge that also reports what changed.
    ///
    /// For each atom in `source`: absent here → inserted; present and
    /// conflicting → resolved with `resolver`; present and compatible → the
    /// strictly more confident atom wins, otherwise ours is kept.
    pub fn merge_with_stats(
        &self,
        source: &BeliefSet,
        resolver: &ConflictResolver,
    ) -> (BeliefSet, MergeStats) {
        let mut merged = self.clone();
        let mut stats = MergeStats::default();

        for incoming in source.beliefs.values() {
            match merged.beliefs.get(&incoming.id) {
                None => {
                    merged.beliefs.insert(incoming.id.clone(), incoming.clone());
                    stats.inserted += 1;
                }
                Some(existing) if contents_conflict(existing, incoming) => {
                    let resolved = resolver.resolve(existing, incoming);
                    trace!(
                        belief_id = %incoming.id,
                        strategy = %resolver.strategy(),
                        "Resolved conflicting belief during merge"
                    );
                    merged.beliefs.insert(incoming.id.clone(), resolved);
                    stats.conflicts_resolved += 1;
                }
                Some(existing) if incoming.confidence > existing.confidence => {
                    merged.beliefs.insert(incoming.id.clone(), incoming.clone());
                    stats.replaced += 1;
                }
                Some(_) => {}
            }
        }

        if stats.changed() {
            merged.touch();
        }
        (merged, stats)
    }

    /// Atoms that are new here, or differ from their copy in `base`.
    pub fn changes_since(&self, base: &BeliefSet) -> BeliefSet {
        let changed = self
            .beliefs
            .values()
            .filter(|atom| base.beliefs.get(&atom.id) != Some(*atom))
            .cloned();
        BeliefSet::from_atoms(self.agent_id.clone(), changed)
    }

    /// Adopts `synced`, a set derived from the snapshot `base`, without
    /// losing what was written here after `base` was taken.
    ///
    /// Later local writes are merged onto `synced` with `resolver`; the
    /// returned stats describe that merge.
    pub fn rebase(
        &self,
        base: &BeliefSet,
        synced: &BeliefSet,
        resolver: &ConflictResolver,
    ) -> (BeliefSet, MergeStats) {
        let local = self.changes_since(base);
        let mut next = self.clone();
        next.replace_beliefs(synced);
        next.merge_with_stats(&local, resolver)
    }

    /// Replaces every belief with those of `other`, keeping this owner.
    pub fn replace_beliefs(&mut self, other: &BeliefSet) {
        self.beliefs = other.beliefs.clone();
        self.touch();
    }

    fn touch(&mut self) {
        self.last_updated = now_ms().max(self.last_updated + 1);
    }
}

impl PartialEq for BeliefSet {
    /// Owner and beliefs; bookkeeping fields are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.agent_id == other.agent_id && self.beliefs == other.beliefs
    }
}
