//! # Population Coordinator
//!
//! Runs whole-population operations over snapshots collected from agent
//! handles, then hands the resulting sets back. Each agent reconciles its
//! result against the snapshot it was computed from, so beliefs written
//! while the operation ran are kept.
//!
//! ```text
//! collect ──→ plan / align / verify (pure, bm-03) ──→ reconcile_belief_set
//!    │                                                     │
//!    └── unreachable agents are skipped ──┐                │
//!                                         ▼                ▼
//!                               ConsistencyTracker  ←── version bump
//! ```
//!
//! The coordinator is the only owner of the [`ConsistencyTracker`]. The
//! lock is never held across an `.await`.

use belief_telemetry::{log_event, time_histogram, CONVERGENCE_SCORE, PLAN_DURATION};
use bm_01_belief_model::{BeliefSet, ConflictResolver};
use bm_02_propagation::{verify_convergence, ConvergenceReport};
use bm_03_consistency::{
    construct_global_state, create_alignment_plan, create_plan, estimate_time_to_consistency,
    execute_alignment_plan, execute_plan, verify, verify_bounded_consistency, AlignmentOptions,
    AlignmentSummary, BoundedConsistency, ConsistencyTracker, GlobalStateOptions, PlanOptions,
    PlanResult, SynchronizationPlan, TimeEstimate, VerificationOptions, VerificationReport,
};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use shared_bus::{BeliefEvent, EventPublisher, InMemoryEventBus};
use shared_types::AgentId;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::agent::AgentHandle;
use crate::error::RuntimeError;

const SUBSYSTEM: &str = "consistency";

/// Default bound on each per-agent snapshot or push.
pub const DEFAULT_COLLECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Belief sets gathered from a population.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub sets: BTreeMap<AgentId, BeliefSet>,
    /// Agents that timed out or had stopped, in handle order.
    pub missing: Vec<AgentId>,
}

/// Outcome of [`Coordinator::ensure_consistency`].
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyRun {
    pub run_id: Uuid,
    pub plan: SynchronizationPlan,
    pub result: PlanResult,
    pub convergence: ConvergenceReport,
    pub global_version: u64,
    /// Agents left out of the run or not updated afterwards.
    pub missing: Vec<AgentId>,
}

/// Outcome of [`Coordinator::align_with_global`].
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentRun {
    pub run_id: Uuid,
    pub global: BeliefSet,
    pub summary: AlignmentSummary,
    pub mean_alignment: f64,
    pub missing: Vec<AgentId>,
}

pub struct Coordinator {
    tracker: Mutex<ConsistencyTracker>,
    bus: Option<Arc<InMemoryEventBus>>,
    collect_timeout: Duration,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Coordinator {
    pub fn new(bus: Option<Arc<InMemoryEventBus>>) -> Self {
        Self {
            tracker: Mutex::new(ConsistencyTracker::new()),
            bus,
            collect_timeout: DEFAULT_COLLECT_TIMEOUT,
        }
    }

    pub fn with_collect_timeout(mut self, timeout: Duration) -> Self {
        self.collect_timeout = timeout;
        self
    }

    /// Copy of the tracker state.
    pub fn tracker(&self) -> ConsistencyTracker {
        self.tracker.lock().clone()
    }

    pub fn lagging_agents(&self, max_lag: u64) -> Vec<AgentId> {
        self.tracker.lock().detect_lagging_agents(max_lag)
    }

    /// Agents not updated by any population operation within `max_age`.
    pub fn stale_agents(&self, max_age: Duration) -> Vec<AgentId> {
        self.tracker.lock().detect_stale_agents(max_age)
    }

    pub fn estimate_time_to_consistency(
        &self,
        target_score: f64,
    ) -> Result<TimeEstimate, RuntimeError> {
        Ok(estimate_time_to_consistency(&self.tracker.lock(), target_score)?)
    }

    /// Fetches every agent's set concurrently; unreachable agents are skipped.
    pub async fn collect_belief_sets(
        &self,
        agents: &[AgentHandle],
    ) -> Result<Snapshot, RuntimeError> {
        let timeout = self.collect_timeout;
        let fetched = join_all(
            agents
                .iter()
                .map(|agent| agent.within(timeout, agent.belief_set())),
        )
        .await;

        let mut snapshot = Snapshot {
            sets: BTreeMap::new(),
            missing: Vec::new(),
        };
        for (agent, result) in agents.iter().zip(fetched) {
            match result {
                Ok(set) => {
                    snapshot.sets.insert(agent.id().clone(), set);
                }
                Err(error) => {
                    log_event!(
                        warn,
                        SUBSYSTEM,
                        "Agent skipped during collection",
                        agent = %agent.id(),
                        error = %error
                    );
                    snapshot.missing.push(agent.id().clone());
                }
            }
        }
        Ok(snapshot)
    }

    async fn collect_nonempty(
        &self,
        agents: &[AgentHandle],
        operation: &'static str,
    ) -> Result<Snapshot, RuntimeError> {
        let snapshot = self.collect_belief_sets(agents).await?;
        if snapshot.sets.is_empty() {
            return Err(RuntimeError::EmptyPopulation(operation));
        }
        Ok(snapshot)
    }

    /// Hands each agent its entry in `sets`, computed from its snapshot in
    /// `bases`; returns agents that could not be updated.
    ///
    /// Agents reconcile rather than overwrite, so beliefs written while the
    /// operation ran are kept.
    async fn push_back(
        &self,
        agents: &[AgentHandle],
        bases: &BTreeMap<AgentId, BeliefSet>,
        sets: &BTreeMap<AgentId, BeliefSet>,
    ) -> Vec<AgentId> {
        let timeout = self.collect_timeout;
        let pushes = agents.iter().filter_map(|agent| {
            let synced = sets.get(agent.id())?;
            let base = bases.get(agent.id())?;
            Some(async move {
                let result = agent
                    .within(
                        timeout,
                        agent.reconcile_belief_set(base.clone(), synced.clone()),
                    )
                    .await;
                (agent.id().clone(), result)
            })
        });

        let mut failed = Vec::new();
        for (agent, result) in join_all(pushes).await {
            match result {
                Ok(kept) if kept.changed() => log_event!(
                    debug,
                    SUBSYSTEM,
                    "Agent kept beliefs written during the run",
                    agent = %agent,
                    inserted = kept.inserted,
                    conflicts_resolved = kept.conflicts_resolved
                ),
                Ok(_) => {}
                Err(error) => {
                    log_event!(
                        warn,
                        SUBSYSTEM,
                        "Agent missed the updated belief set",
                        agent = %agent,
                        error = %error
                    );
                    failed.push(agent);
                }
            }
        }
        failed
    }

    /// Bumps the global version, stamps every updated agent with it and
    /// records a convergence sample.
    fn record_round<'a>(
        &self,
        updated: impl IntoIterator<Item = &'a AgentId>,
        convergence: &ConvergenceReport,
    ) -> u64 {
        let mut tracker = self.tracker.lock();
        let version = tracker.increment_global_version();
        for agent in updated {
            tracker.update_agent_version(agent.clone(), version);
        }
        tracker.record_convergence_check(convergence.coverage, version);
        CONVERGENCE_SCORE.set(convergence.coverage);
        version
    }

    // =========================================================================
    // WHOLE-POPULATION OPERATIONS
    // =========================================================================

    pub async fn global_belief_state(
        &self,
        agents: &[AgentHandle],
        options: &GlobalStateOptions,
    ) -> Result<BeliefSet, RuntimeError> {
        let snapshot = self.collect_nonempty(agents, "global_belief_state").await?;
        let resolver = ConflictResolver::new(options.conflict_strategy);
        Ok(construct_global_state(
            snapshot.sets.values(),
            &resolver,
            options.confidence_threshold,
        )?)
    }

    /// Plans and executes batched synchronisation, then hands every agent
    /// its synchronised set.
    pub async fn ensure_consistency(
        &self,
        agents: &[AgentHandle],
        options: PlanOptions,
    ) -> Result<ConsistencyRun, RuntimeError> {
        let _timer = time_histogram!(PLAN_DURATION);
        let run_id = Uuid::new_v4();
        let Snapshot { sets, mut missing } =
            self.collect_nonempty(agents, "ensure_consistency").await?;

        let order: Vec<AgentId> = agents
            .iter()
            .map(|agent| agent.id().clone())
            .filter(|id| sets.contains_key(id))
            .collect();
        let threshold = options.convergence_threshold;
        let plan = create_plan(&order, options);
        log_event!(
            info,
            SUBSYSTEM,
            "Synchronisation plan created",
            run_id = %run_id,
            agents = plan.total_agents,
            batches = plan.batch_count,
            estimated_ms = plan.estimated_completion_ms
        );

        let bases = sets.clone();
        let result = execute_plan(&plan, sets).await;
        let failed = self.push_back(agents, &bases, &result.belief_sets).await;
        let updated: Vec<&AgentId> = result
            .belief_sets
            .keys()
            .filter(|id| !failed.contains(id))
            .collect();

        let convergence = verify_convergence(result.belief_sets.values(), threshold);
        let global_version = self.record_round(updated, &convergence);
        missing.extend(failed);

        log_event!(
            info,
            SUBSYSTEM,
            "Consistency run finished",
            run_id = %run_id,
            status = ?result.status,
            coverage = convergence.coverage,
            global_version
        );
        self.publish(BeliefEvent::PlanCompleted {
            run_id,
            batches_run: result.batches.len(),
            early_stop: result.early_stop.is_some(),
            failed: result.is_failed(),
        })
        .await;
        self.publish(BeliefEvent::ConvergenceChecked {
            score: convergence.coverage,
            converged: convergence.converged,
            global_version,
        })
        .await;

        Ok(ConsistencyRun {
            run_id,
            plan,
            result,
            convergence,
            global_version,
            missing,
        })
    }

    /// Audits the population without changing it. The coverage is recorded
    /// against the current global version.
    pub async fn verify_consistency(
        &self,
        agents: &[AgentHandle],
        options: &VerificationOptions,
    ) -> Result<VerificationReport, RuntimeError> {
        let snapshot = self.collect_nonempty(agents, "verify_consistency").await?;
        let report = verify(&snapshot.sets, options)?;

        let global_version = {
            let mut tracker = self.tracker.lock();
            let version = tracker.global_version();
            tracker.record_convergence_check(report.convergence.coverage, version);
            version
        };
        CONVERGENCE_SCORE.set(report.convergence.coverage);

        log_event!(
            info,
            SUBSYSTEM,
            "Consistency verified",
            consistent = report.consistent,
            coverage = report.convergence.coverage,
            mean_alignment = report.mean_alignment,
            missing = snapshot.missing.len()
        );
        self.publish(BeliefEvent::ConvergenceChecked {
            score: report.convergence.coverage,
            converged: report.convergence.converged,
            global_version,
        })
        .await;
        Ok(report)
    }

    /// Pulls agents toward the global state, most misaligned first, within
    /// the options' time budget.
    pub async fn align_with_global(
        &self,
        agents: &[AgentHandle],
        options: &AlignmentOptions,
    ) -> Result<AlignmentRun, RuntimeError> {
        let run_id = Uuid::new_v4();
        let Snapshot { sets, mut missing } =
            self.collect_nonempty(agents, "align_with_global").await?;

        let resolver = ConflictResolver::new(options.global.conflict_strategy);
        let global =
            construct_global_state(sets.values(), &resolver, options.global.confidence_threshold)?;
        let plan = create_alignment_plan(&sets, &global);
        let bases = sets.clone();
        let summary = execute_alignment_plan(
            &plan,
            sets,
            &global,
            &options.enforcement,
            options.time_budget,
        );

        let aligned_sets: BTreeMap<AgentId, BeliefSet> = summary
            .aligned
            .iter()
            .filter_map(|id| {
                summary
                    .belief_sets
                    .get(id)
                    .map(|set| (id.clone(), set.clone()))
            })
            .collect();
        let failed = self.push_back(agents, &bases, &aligned_sets).await;
        let updated: Vec<&AgentId> = aligned_sets
            .keys()
            .filter(|id| !failed.contains(id))
            .collect();
        let convergence = verify_convergence(summary.belief_sets.values(), 1.0);
        self.record_round(updated, &convergence);
        missing.extend(failed);

        let mean_alignment = if summary.scores_after.is_empty() {
            1.0
        } else {
            summary.scores_after.values().sum::<f64>() / summary.scores_after.len() as f64
        };
        log_event!(
            info,
            SUBSYSTEM,
            "Global alignment finished",
            run_id = %run_id,
            aligned = summary.aligned.len(),
            skipped = summary.skipped.len(),
            mean_alignment
        );
        self.publish(BeliefEvent::AlignmentCompleted {
            run_id,
            aligned: summary.aligned.len(),
            skipped: summary.skipped.len(),
            mean_alignment,
        })
        .await;

        Ok(AlignmentRun {
            run_id,
            global,
            summary,
            mean_alignment,
            missing,
        })
    }

    /// Whether `target_score` holds now or is projected within `max_time`
    /// from the recorded convergence history.
    pub async fn bounded_consistency(
        &self,
        agents: &[AgentHandle],
        target_score: f64,
        max_time: Duration,
    ) -> Result<BoundedConsistency, RuntimeError> {
        let snapshot = self.collect_nonempty(agents, "bounded_consistency").await?;
        let tracker = self.tracker.lock();
        Ok(verify_bounded_consistency(
            snapshot.sets.values(),
            &tracker,
            target_score,
            max_time,
        )?)
    }

    async fn publish(&self, event: BeliefEvent) {
        if let Some(bus) = &self.bus {
            bus.publish(event).await;
        }
    }
}
