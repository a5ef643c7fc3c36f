//! # Belief Atoms
//!
//! A belief atom is a single timestamped, confidence-weighted assertion made
//! by one source agent.
//!
//! ## Identity
//!
//! Ids are SHA-256 fingerprints over the content, the source, the creation
//! timestamp and a process-wide monotonic counter. The counter keeps two
//! atoms with identical content and source created in the same millisecond
//! from colliding. Callers that need several agents to hold the same belief
//! pin an explicit id through [`AtomOptions::with_id`].
//!
//! ## Confidence
//!
//! Confidence is expected in `[0, 1]` but is not clamped here; producers
//! are responsible for the range.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{now_ms, AgentId, BeliefContent, BeliefId, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Hex characters kept from the SHA-256 digest.
const ID_HEX_LEN: usize = 32;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Optional creation parameters for [`BeliefAtom::create`].
#[derive(Debug, Clone, Default)]
pub struct AtomOptions {
    pub id: Option<BeliefId>,
    pub timestamp: Option<Timestamp>,
    pub metadata: BTreeMap<String, BeliefContent>,
    pub tags: BTreeSet<String>,
}

impl AtomOptions {
    pub fn with_id(mut self, id: impl Into<BeliefId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: BeliefContent) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// An immutable, versioned assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefAtom {
    pub id: BeliefId,
    pub content: BeliefContent,
    pub source: AgentId,
    pub confidence: f64,
    pub timestamp: Timestamp,
    pub metadata: BTreeMap<String, BeliefContent>,
    pub tags: BTreeSet<String>,
}

impl BeliefAtom {
    /// Creates an atom stamped with the current time and a fresh id.
    pub fn new(content: BeliefContent, source: AgentId, confidence: f64) -> Self {
        Self::create(content, source, confidence, AtomOptions::default())
    }

    pub fn create(
        content: BeliefContent,
        source: AgentId,
        confidence: f64,
        opts: AtomOptions,
    ) -> Self {
        let timestamp = opts.timestamp.unwrap_or_else(now_ms);
        let id = opts
            .id
            .unwrap_or_else(|| fingerprint(&content, &source, timestamp));

        Self {
            id,
            content,
            source,
            confidence,
            timestamp,
            metadata: opts.metadata,
            tags: opts.tags,
        }
    }

    /// New atom with a different confidence.
    pub fn with_confidence(&self, confidence: f64) -> Self {
        Self {
            confidence,
            timestamp: now_ms(),
            ..self.clone()
        }
    }

    /// New atom with `merge` layered over the existing metadata.
    pub fn with_metadata(&self, merge: BTreeMap<String, BeliefContent>) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.extend(merge);
        Self {
            metadata,
            timestamp: now_ms(),
            ..self.clone()
        }
    }

    /// New atom with `added` tags unioned in.
    pub fn with_tags<I, S>(&self, added: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags = self.tags.clone();
        tags.extend(added.into_iter().map(Into::into));
        Self {
            tags,
            timestamp: now_ms(),
            ..self.clone()
        }
    }

    /// Copy of this atom restamped at an explicit time.
    pub fn restamped(&self, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

fn fingerprint(content: &BeliefContent, source: &AgentId, timestamp: Timestamp) -> BeliefId {
    let sequence = ID_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(format!("{content:?}").as_bytes());
    hasher.update([0u8]);
    hasher.update(source.as_str().as_bytes());
    hasher.update(timestamp.to_le_bytes());
    hasher.update(sequence.to_le_bytes());

    let mut encoded = hex::encode(hasher.finalize());
    encoded.truncate(ID_HEX_LEN);
    BeliefId(encoded)
}
