//! # Plan Execution
//!
//! Runs a [`SynchronizationPlan`] batch by batch:
//!
//! 1. wait until the batch's scheduled start (scaled by `time_scale`)
//! 2. all-pairs synchronisation across the batch's agents
//! 3. optional convergence check over every set; stop the plan early if
//!    converged and `early_stop` is set
//!
//! Each batch step yields `ControlFlow::Continue(record)` or
//! `ControlFlow::Break(stop)`. A fault inside a batch becomes a
//! [`PlanStatus::Failed`] result; the sets from the last completed batch
//! are returned with it.

use bm_01_belief_model::{BeliefSet, ConflictResolver};
use bm_02_propagation::{verify_convergence, ConvergenceReport};
use serde::{Deserialize, Serialize};
use shared_types::AgentId;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::domain::{synchronize_beliefs, PlanOptions, SyncBatch, SyncStats, SynchronizationPlan};
use crate::events::ConsistencyError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_id: usize,
    pub agents: Vec<AgentId>,
    pub stats: SyncStats,
    /// Offset from plan start when the batch began, in ms.
    pub started_ms: u64,
    pub duration_ms: u64,
    pub convergence: Option<ConvergenceReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStop {
    pub batch_id: usize,
    pub convergence: ConvergenceReport,
    pub skipped_batches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanStatus {
    Completed,
    EarlyStopped,
    Failed { batch_id: usize, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub status: PlanStatus,
    pub belief_sets: BTreeMap<AgentId, BeliefSet>,
    pub batches: Vec<BatchRecord>,
    pub early_stop: Option<EarlyStop>,
    pub elapsed_ms: u64,
}

impl PlanResult {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, PlanStatus::Failed { .. })
    }
}

enum BatchStop {
    Converged(BatchRecord, ConvergenceReport),
    Fault(usize, ConsistencyError),
}

/// Executes `plan` with a resolver built from the plan's conflict strategy.
pub async fn execute_plan(
    plan: &SynchronizationPlan,
    sets: BTreeMap<AgentId, BeliefSet>,
) -> PlanResult {
    let resolver = ConflictResolver::new(plan.options.conflict_strategy);
    execute_plan_with(plan, sets, &resolver).await
}

/// Executes `plan` with an explicit resolver (e.g. a seeded one).
pub async fn execute_plan_with(
    plan: &SynchronizationPlan,
    mut sets: BTreeMap<AgentId, BeliefSet>,
    resolver: &ConflictResolver,
) -> PlanResult {
    let started = Instant::now();
    let options = &plan.options;
    let mut batches = Vec::with_capacity(plan.batches.len());
    let mut status = PlanStatus::Completed;
    let mut early_stop = None;

    for (position, batch) in plan.batches.iter().enumerate() {
        let step = match wait_for_window(started, batch, options).await {
            Ok(()) => run_batch(batch, &mut sets, resolver, options, started),
            Err(error) => ControlFlow::Break(BatchStop::Fault(batch.id, error)),
        };

        match step {
            ControlFlow::Continue(record) => batches.push(record),
            ControlFlow::Break(BatchStop::Converged(record, convergence)) => {
                let skipped_batches = plan.batches.len() - position - 1;
                info!(
                    batch_id = batch.id,
                    skipped_batches,
                    coverage = convergence.coverage,
                    "Converged, stopping plan early"
                );
                batches.push(record);
                early_stop = Some(EarlyStop {
                    batch_id: batch.id,
                    convergence,
                    skipped_batches,
                });
                status = PlanStatus::EarlyStopped;
                break;
            }
            ControlFlow::Break(BatchStop::Fault(batch_id, error)) => {
                warn!(batch_id, error = %error, "Plan batch failed");
                status = PlanStatus::Failed {
                    batch_id,
                    error: error.to_string(),
                };
                break;
            }
        }
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        batches_run = batches.len(),
        planned = plan.batch_count,
        elapsed_ms,
        "Synchronization plan finished"
    );

    PlanResult {
        status,
        belief_sets: sets,
        batches,
        early_stop,
        elapsed_ms,
    }
}

/// Sleeps until the batch's scaled start. A scale of zero never waits; a
/// negative, non-finite or overflowing schedule is a fault.
async fn wait_for_window(
    started: Instant,
    batch: &SyncBatch,
    options: &PlanOptions,
) -> Result<(), ConsistencyError> {
    let unschedulable = || ConsistencyError::UnschedulableBatch {
        batch_id: batch.id,
        time_scale: options.time_scale,
    };
    if !options.time_scale.is_finite() || options.time_scale < 0.0 {
        return Err(unschedulable());
    }
    if options.time_scale == 0.0 {
        return Ok(());
    }

    let deadline = Duration::try_from_secs_f64(
        batch.start_ms as f64 * options.time_scale / 1_000.0,
    )
    .ok()
    .and_then(|offset| started.checked_add(offset))
    .ok_or_else(unschedulable)?;
    tokio::time::sleep_until(deadline).await;

    let budget =
        Duration::try_from_secs_f64(options.max_time_ms as f64 * options.time_scale / 1_000.0);
    if matches!(budget, Ok(budget) if started.elapsed() > budget) {
        warn!(
            batch_id = batch.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Plan running past its time budget"
        );
    }
    Ok(())
}

fn run_batch(
    batch: &SyncBatch,
    sets: &mut BTreeMap<AgentId, BeliefSet>,
    resolver: &ConflictResolver,
    options: &PlanOptions,
    started: Instant,
) -> ControlFlow<BatchStop, BatchRecord> {
    let batch_started = Instant::now();

    let stats = match synchronize_beliefs(sets, &batch.agents, resolver) {
        Ok(stats) => stats,
        Err(error) => return ControlFlow::Break(BatchStop::Fault(batch.id, error)),
    };

    let convergence = options
        .check_convergence
        .then(|| verify_convergence(sets.values(), options.convergence_threshold));

    let record = BatchRecord {
        batch_id: batch.id,
        agents: batch.agents.clone(),
        stats,
        started_ms: batch_started.duration_since(started).as_millis() as u64,
        duration_ms: batch_started.elapsed().as_millis() as u64,
        convergence: convergence.clone(),
    };

    match convergence {
        Some(report) if report.converged && options.early_stop => {
            ControlFlow::Break(BatchStop::Converged(record, report))
        }
        _ => ControlFlow::Continue(record),
    }
}
