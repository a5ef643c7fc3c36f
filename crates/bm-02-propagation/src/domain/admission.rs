//! Admission of incoming belief updates into a local set.
//!
//! | Local state | Incoming | Outcome |
//! |-------------|----------|---------|
//! | id absent | any | accept iff `confidence >= threshold` |
//! | id present | strictly newer, conflicting | accept the resolved atom |
//! | id present | strictly newer, compatible | accept iff strictly more confident |
//! | id present | same age or older | reject |

use bm_01_belief_model::{contents_conflict, BeliefAtom, BeliefSet, ConflictResolver};
use serde::{Deserialize, Serialize};
use shared_types::Timestamp;
use std::fmt;
use tracing::debug;

/// Why an update was turned away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// New belief below the acceptance threshold.
    BelowThreshold { confidence: f64, threshold: f64 },
    /// Not newer than the belief already held.
    Stale { incoming: Timestamp, held: Timestamp },
    /// Newer and compatible, but not more confident than the held belief.
    NotMoreConfident { incoming: f64, held: f64 },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowThreshold {
                confidence,
                threshold,
            } => write!(f, "confidence {confidence} below threshold {threshold}"),
            Self::Stale { incoming, held } => {
                write!(f, "timestamp {incoming} not newer than held {held}")
            }
            Self::NotMoreConfident { incoming, held } => {
                write!(f, "confidence {incoming} not above held {held}")
            }
        }
    }
}

/// Outcome of [`admit_update`]. Rejection is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdmissionDecision {
    Accepted {
        /// The update conflicted with the held belief and was resolved.
        conflict_resolved: bool,
    },
    Rejected(RejectionReason),
}

impl AdmissionDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn conflict_resolved(&self) -> bool {
        matches!(
            self,
            Self::Accepted {
                conflict_resolved: true
            }
        )
    }
}

/// Decides whether `incoming` enters `local`; returns the resulting set.
///
/// On rejection the returned set equals `local`.
pub fn admit_update(
    incoming: &BeliefAtom,
    local: &BeliefSet,
    acceptance_threshold: f64,
    resolver: &ConflictResolver,
) -> (BeliefSet, AdmissionDecision) {
    let mut updated = local.clone();

    let decision = match local.get(&incoming.id) {
        None if incoming.confidence >= acceptance_threshold => {
            updated.upsert(incoming.clone());
            AdmissionDecision::Accepted {
                conflict_resolved: false,
            }
        }
        None => AdmissionDecision::Rejected(RejectionReason::BelowThreshold {
            confidence: incoming.confidence,
            threshold: acceptance_threshold,
        }),
        Some(held) if incoming.timestamp <= held.timestamp => {
            AdmissionDecision::Rejected(RejectionReason::Stale {
                incoming: incoming.timestamp,
                held: held.timestamp,
            })
        }
        Some(held) if contents_conflict(held, incoming) => {
            updated.upsert(resolver.resolve(held, incoming));
            AdmissionDecision::Accepted {
                conflict_resolved: true,
            }
        }
        Some(held) if incoming.confidence > held.confidence => {
            updated.upsert(incoming.clone());
            AdmissionDecision::Accepted {
                conflict_resolved: false,
            }
        }
        Some(held) => AdmissionDecision::Rejected(RejectionReason::NotMoreConfident {
            incoming: incoming.confidence,
            held: held.confidence,
        }),
    };

    debug!(
        agent = %local.agent_id(),
        belief_id = %incoming.id,
        source = %incoming.source,
        accepted = decision.is_accepted(),
        "Admission decided"
    );

    (updated, decision)
}
