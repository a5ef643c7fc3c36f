//! Propagation modes and per-target delivery outcomes.

use serde::{Deserialize, Serialize};
use shared_types::AgentId;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::RejectionReason;
use crate::events::{PropagationError, UnknownPropagationMode};

/// How an atom is pushed to its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PropagationMode {
    /// Fire-and-forget.
    #[default]
    Async,
    /// Wait per target for an accept/reject acknowledgement.
    Sync,
}

impl FromStr for PropagationMode {
    type Err = UnknownPropagationMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "async" => Ok(Self::Async),
            "sync" => Ok(Self::Sync),
            other => Err(UnknownPropagationMode(other.to_string())),
        }
    }
}

impl fmt::Display for PropagationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async => f.write_str("async"),
            Self::Sync => f.write_str("sync"),
        }
    }
}

/// Propagation configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationConfig {
    pub mode: PropagationMode,
    /// Per-target acknowledgement timeout in sync mode.
    pub timeout: Duration,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            mode: PropagationMode::Async,
            timeout: Duration::from_millis(5_000),
        }
    }
}

/// What happened at one target.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryStatus {
    /// Handed off without waiting (async mode).
    Sent,
    Accepted,
    Rejected(RejectionReason),
    Failed(PropagationError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub target: AgentId,
    pub status: DeliveryStatus,
}

impl DeliveryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, DeliveryStatus::Failed(_))
    }
}

/// Counts over a list of outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationSummary {
    pub sent: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl PropagationSummary {
    pub fn from_outcomes(outcomes: &[DeliveryOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut acc, outcome| {
                match outcome.status {
                    DeliveryStatus::Sent => acc.sent += 1,
                    DeliveryStatus::Accepted => acc.accepted += 1,
                    DeliveryStatus::Rejected(_) => acc.rejected += 1,
                    DeliveryStatus::Failed(_) => acc.failed += 1,
                }
                acc
            })
    }

    /// Targets the atom reached, acknowledged or not.
    pub fn delivered(&self) -> usize {
        self.sent + self.accepted + self.rejected
    }
}
