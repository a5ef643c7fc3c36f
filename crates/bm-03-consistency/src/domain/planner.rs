//! # Eventual Consistency Planning
//!
//! Splits a population into fixed-size batches scheduled in consecutive
//! windows, and projects how long the population needs to reach a target
//! convergence score.
//!
//! ```text
//! agents: a1 a2 a3 | a4 a5 a6 | a7 a8 a9 | a10
//!         batch 0  | batch 1  | batch 2  | batch 3
//! window: [0,T)    | [T,2T)   | [2T,3T)  | [3T,4T)     T = max(sync_interval, max_time / batches)
//! ```
//!
//! Plans are executed by [`crate::service::execute_plan`].

use bm_01_belief_model::{BeliefSet, ConflictResolver, MergeStats, ResolutionStrategy};
use bm_02_propagation::{verify_convergence, ConvergenceReport, DEFAULT_CONVERGENCE_THRESHOLD};
use serde::{Deserialize, Serialize};
use shared_types::AgentId;
use std::collections::BTreeMap;
use std::time::Duration;

use super::ConsistencyTracker;
use crate::events::ConsistencyError;

/// Samples used by the time-to-consistency estimator.
pub const ESTIMATOR_WINDOW: usize = 5;

/// Planning and execution options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOptions {
    pub max_time_ms: u64,
    pub sync_interval_ms: u64,
    /// Agents per batch; 0 is treated as 1.
    pub batch_size: usize,
    pub conflict_strategy: ResolutionStrategy,
    /// Run a convergence check after every batch.
    pub check_convergence: bool,
    /// Stop the whole plan once a check reports convergence.
    pub early_stop: bool,
    pub convergence_threshold: f64,
    /// Multiplier applied to batch start times when sleeping; 0 disables waiting.
    pub time_scale: f64,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            max_time_ms: 30_000,
            sync_interval_ms: 1_000,
            batch_size: 5,
            conflict_strategy: ResolutionStrategy::HighestConfidence,
            check_convergence: true,
            early_stop: true,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            time_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBatch {
    pub id: usize,
    pub agents: Vec<AgentId>,
    /// Window start, ms from plan start.
    pub start_ms: u64,
    /// Window end (exclusive), ms from plan start.
    pub end_ms: u64,
}

/// Immutable schedule of synchronisation batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynchronizationPlan {
    pub total_agents: usize,
    pub batch_count: usize,
    pub estimated_completion_ms: u64,
    pub batches: Vec<SyncBatch>,
    pub options: PlanOptions,
}

pub fn create_plan(agents: &[AgentId], options: PlanOptions) -> SynchronizationPlan {
    let batch_size = options.batch_size.max(1);
    let batch_count = agents.len().div_ceil(batch_size);

    let window_ms = if batch_count == 0 {
        0
    } else {
        options
            .sync_interval_ms
            .max(options.max_time_ms / batch_count as u64)
    };

    let batches = agents
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| SyncBatch {
            id: i,
            agents: chunk.to_vec(),
            start_ms: i as u64 * window_ms,
            end_ms: (i as u64 + 1) * window_ms,
        })
        .collect();

    SynchronizationPlan {
        total_agents: agents.len(),
        batch_count,
        estimated_completion_ms: batch_count as u64 * window_ms,
        batches,
        options,
    }
}

/// Counters for one or more pairwise synchronisations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub pairs: usize,
    pub inserted: usize,
    pub conflicts_resolved: usize,
    pub replaced: usize,
}

impl SyncStats {
    fn absorb(&mut self, merge: MergeStats) {
        self.inserted += merge.inserted;
        self.conflicts_resolved += merge.conflicts_resolved;
        self.replaced += merge.replaced;
    }
}

/// Mutual merge of two sets: `a` absorbs `b`, then `b` absorbs the result.
pub fn synchronize_pair(
    a: &BeliefSet,
    b: &BeliefSet,
    resolver: &ConflictResolver,
) -> (BeliefSet, BeliefSet, SyncStats) {
    let mut stats = SyncStats {
        pairs: 1,
        ..SyncStats::default()
    };
    let (a_next, first) = a.merge_with_stats(b, resolver);
    let (b_next, second) = b.merge_with_stats(&a_next, resolver);
    stats.absorb(first);
    stats.absorb(second);
    (a_next, b_next, stats)
}

/// All-pairs synchronisation across `agents`, updating `sets` in place.
///
/// Fails without touching `sets` if any agent has no set.
pub fn synchronize_beliefs(
    sets: &mut BTreeMap<AgentId, BeliefSet>,
    agents: &[AgentId],
    resolver: &ConflictResolver,
) -> Result<SyncStats, ConsistencyError> {
    if let Some(missing) = agents.iter().find(|agent| !sets.contains_key(*agent)) {
        return Err(ConsistencyError::UnknownAgent(missing.clone()));
    }

    let mut stats = SyncStats::default();
    for (i, left) in agents.iter().enumerate() {
        for right in agents.iter().skip(i + 1) {
            if left == right {
                continue;
            }
            let (Some(a), Some(b)) = (sets.get(left), sets.get(right)) else {
                continue;
            };
            let (a_next, b_next, pair) = synchronize_pair(a, b, resolver);
            sets.insert(left.clone(), a_next);
            sets.insert(right.clone(), b_next);
            stats.pairs += pair.pairs;
            stats.absorb(MergeStats {
                inserted: pair.inserted,
                conflicts_resolved: pair.conflicts_resolved,
                replaced: pair.replaced,
            });
        }
    }
    Ok(stats)
}

/// Linear projection of the time needed to reach a target score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeEstimate {
    pub current_score: f64,
    pub target_score: f64,
    pub average_delta: f64,
    pub steps: u64,
    pub seconds_per_step: f64,
    pub estimated_secs: f64,
}

/// Extrapolates from the average delta of the last [`ESTIMATOR_WINDOW`]
/// convergence samples.
pub fn estimate_time_to_consistency(
    tracker: &ConsistencyTracker,
    target_score: f64,
) -> Result<TimeEstimate, ConsistencyError> {
    let mut window: Vec<_> = tracker.history().take(ESTIMATOR_WINDOW).copied().collect();
    window.reverse();

    let (first, last) = match (window.first(), window.last()) {
        (Some(first), Some(last)) if window.len() >= 2 => (*first, *last),
        _ => {
            return Err(ConsistencyError::InsufficientData {
                points: window.len(),
            })
        }
    };

    let intervals = (window.len() - 1) as f64;
    let average_delta = (last.score - first.score) / intervals;
    if average_delta <= 0.0 {
        return Err(ConsistencyError::NoImprovement { average_delta });
    }

    let seconds_per_step = last.timestamp.saturating_sub(first.timestamp) as f64 / 1_000.0 / intervals;
    let remaining = (target_score - last.score).max(0.0);
    let steps = (remaining / average_delta).ceil() as u64;

    Ok(TimeEstimate {
        current_score: last.score,
        target_score,
        average_delta,
        steps,
        seconds_per_step,
        estimated_secs: steps as f64 * seconds_per_step,
    })
}

/// Successful outcome of [`verify_bounded_consistency`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoundedConsistency {
    AlreadyConverged(ConvergenceReport),
    Achievable(TimeEstimate),
}

/// Checks that `target_score` is reached now or within `max_time`.
pub fn verify_bounded_consistency<'a, I>(
    sets: I,
    tracker: &ConsistencyTracker,
    target_score: f64,
    max_time: Duration,
) -> Result<BoundedConsistency, ConsistencyError>
where
    I: IntoIterator<Item = &'a BeliefSet>,
{
    let report = verify_convergence(sets, target_score);
    if report.converged {
        return Ok(BoundedConsistency::AlreadyConverged(report));
    }

    let estimate = estimate_time_to_consistency(tracker, target_score)?;
    let bound_secs = max_time.as_secs_f64();
    if estimate.estimated_secs <= bound_secs {
        Ok(BoundedConsistency::Achievable(estimate))
    } else {
        Err(ConsistencyError::ExceedsTimeBound {
            estimated_secs: estimate.estimated_secs,
            bound_secs,
        })
    }
}
