//! # Conflict Resolution
//!
//! Two atoms conflict when their contents share a structural shape but
//! differ in value. A [`ConflictResolver`] picks (or synthesises) the atom
//! that survives.
//!
//! | Strategy | Winner |
//! |----------|--------|
//! | `HighestConfidence` | higher confidence, ties to `a` |
//! | `Newest` | strictly newer timestamp, ties to `b` |
//! | `Probabilistic` | `a` with probability `a.c / (a.c + b.c)` |
//! | `Authority` | higher source rank, ties to `a` |
//! | `Merge` | synthesised: `a`'s content, mean confidence, unioned metadata/tags |

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use shared_types::{AgentId, BeliefId};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::{BeliefAtom, UnknownStrategy};

/// Structural conflict between the contents of two atoms, ignoring ids.
pub fn contents_conflict(a: &BeliefAtom, b: &BeliefAtom) -> bool {
    a.content.conflicts_with(&b.content)
}

/// Conflict between two distinct atoms.
pub fn are_conflicting(a: &BeliefAtom, b: &BeliefAtom) -> bool {
    a.id != b.id && contents_conflict(a, b)
}

/// An unordered pair of conflicting belief ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflictPair {
    pub a: BeliefId,
    pub b: BeliefId,
}

impl ConflictPair {
    /// Builds a pair with ids in canonical order.
    pub fn new(x: BeliefId, y: BeliefId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }
}

/// Conflict resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    #[default]
    HighestConfidence,
    Newest,
    Probabilistic,
    Authority,
    Merge,
}

impl ResolutionStrategy {
    /// Parses a strategy name; unknown names fall back to `HighestConfidence`.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighestConfidence => "highest_confidence",
            Self::Newest => "newest",
            Self::Probabilistic => "probabilistic",
            Self::Authority => "authority",
            Self::Merge => "merge",
        }
    }
}

impl FromStr for ResolutionStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "highest_confidence" | "highestconfidence" => Ok(Self::HighestConfidence),
            "newest" => Ok(Self::Newest),
            "probabilistic" => Ok(Self::Probabilistic),
            "authority" => Ok(Self::Authority),
            "merge" => Ok(Self::Merge),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies a [`ResolutionStrategy`] to conflicting atom pairs.
///
/// Owns the random source used by `Probabilistic` so tests can seed it.
/// Safe to share by reference; the RNG sits behind a mutex.
pub struct ConflictResolver {
    strategy: ResolutionStrategy,
    authority: HashMap<AgentId, u32>,
    rng: Mutex<StdRng>,
}

impl ConflictResolver {
    pub fn new(strategy: ResolutionStrategy) -> Self {
        Self {
            strategy,
            authority: HashMap::new(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Resolver with a deterministic random source.
    pub fn seeded(strategy: ResolutionStrategy, seed: u64) -> Self {
        Self {
            strategy,
            authority: HashMap::new(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Installs source authority ranks. Sources without a rank count as 0.
    pub fn with_authority(mut self, ranks: HashMap<AgentId, u32>) -> Self {
        self.authority = ranks;
        self
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    /// Resolves a conflicting pair into the surviving atom.
    pub fn resolve(&self, a: &BeliefAtom, b: &BeliefAtom) -> BeliefAtom {
        match self.strategy {
            ResolutionStrategy::HighestConfidence => {
                if b.confidence > a.confidence {
                    b.clone()
                } else {
                    a.clone()
                }
            }
            ResolutionStrategy::Newest => {
                if a.timestamp > b.timestamp {
                    a.clone()
                } else {
                    b.clone()
                }
            }
            ResolutionStrategy::Probabilistic => {
                let total = a.confidence + b.confidence;
                let p_a = if total > 0.0 { a.confidence / total } else { 0.5 };
                let draw: f64 = self.rng.lock().gen();
                if draw < p_a {
                    a.clone()
                } else {
                    b.clone()
                }
            }
            ResolutionStrategy::Authority => {
                if self.rank(&b.source) > self.rank(&a.source) {
                    b.clone()
                } else {
                    a.clone()
                }
            }
            ResolutionStrategy::Merge => merge_atoms(a, b),
        }
    }

    fn rank(&self, source: &AgentId) -> u32 {
        self.authority.get(source).copied().unwrap_or(0)
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(ResolutionStrategy::default())
    }
}

impl From<ResolutionStrategy> for ConflictResolver {
    fn from(strategy: ResolutionStrategy) -> Self {
        Self::new(strategy)
    }
}

impl fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("strategy", &self.strategy)
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

/// First-writer content; true semantic content merging is not attempted.
fn merge_atoms(a: &BeliefAtom, b: &BeliefAtom) -> BeliefAtom {
    let mut metadata = b.metadata.clone();
    metadata.extend(a.metadata.clone());
    let mut tags = a.tags.clone();
    tags.extend(b.tags.iter().cloned());

    BeliefAtom {
        id: a.id.clone(),
        content: a.content.clone(),
        source: a.source.clone(),
        confidence: (a.confidence + b.confidence) / 2.0,
        timestamp: a.timestamp.max(b.timestamp),
        metadata,
        tags,
    }
}
