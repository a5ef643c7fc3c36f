//! # Belief-Mesh Simulation
//!
//! Spawns a population whose agents disagree about who leads, connects them
//! in a ring, drives the population to consistency and prints the
//! verification verdict as JSON.
//!
//! ## Startup Sequence
//!
//! 1. Initialise telemetry (`BM_LOG_LEVEL`, `BM_JSON_LOGS`, ...)
//! 2. Load and validate [`RuntimeConfig`] from the environment
//! 3. Spawn agents and author conflicting beliefs
//! 4. Verify, run `ensure_consistency`, verify again
//! 5. Print the report

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use belief_telemetry::{gather_metrics, init_telemetry, TelemetryConfig};
use bm_01_belief_model::AtomOptions;
use bm_03_consistency::{PlanOptions, VerificationOptions};
use serde_json::json;
use shared_bus::{EventFilter, InMemoryEventBus};
use shared_types::{now_ms, BeliefContent};
use tracing::{debug, info};

use agent_runtime::{connect_ring, spawn_population, Coordinator, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(TelemetryConfig::from_env()).context("Failed to initialise telemetry")?;

    let config = RuntimeConfig::from_env().context("Invalid runtime configuration")?;
    config.validate().context("Invalid runtime configuration")?;
    info!(
        agents = config.agents,
        batch_size = config.batch_size,
        strategy = %config.agent.conflict_strategy,
        "Starting Belief-Mesh simulation"
    );

    let bus = Arc::new(InMemoryEventBus::new());
    let mut events = bus.subscribe(EventFilter::all());
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(topic = ?event.topic(), event = ?event, "Bus event");
        }
    });

    let agents = spawn_population(config.agents, &config.agent, Some(Arc::clone(&bus)));
    let started = now_ms();
    let n = agents.len();
    for (i, agent) in agents.iter().enumerate() {
        let candidate = BeliefContent::tuple([
            BeliefContent::symbol("leader"),
            BeliefContent::symbol(agent.id().as_str()),
        ]);
        let confidence = 0.4 + 0.5 * (i + 1) as f64 / n as f64;
        agent
            .author_belief(
                candidate,
                confidence,
                AtomOptions::default().with_id("leader").at(started),
            )
            .await
            .with_context(|| format!("Agent {} rejected its own belief", agent.id()))?;
        agent
            .author_belief(
                BeliefContent::record([
                    ("observer", BeliefContent::symbol(agent.id().as_str())),
                    ("load", BeliefContent::float(confidence)),
                ]),
                0.8,
                AtomOptions::default().with_tag("observation"),
            )
            .await
            .with_context(|| format!("Agent {} rejected its observation", agent.id()))?;
    }
    connect_ring(&agents).await.context("Failed to connect agents")?;

    let coordinator = Coordinator::new(Some(Arc::clone(&bus)));
    let verification = VerificationOptions::default();
    let before = coordinator
        .verify_consistency(&agents, &verification)
        .await
        .context("Initial verification failed")?;

    let options = PlanOptions {
        max_time_ms: config.max_time_ms,
        sync_interval_ms: config.sync_interval_ms,
        batch_size: config.batch_size,
        conflict_strategy: config.agent.conflict_strategy,
        time_scale: config.time_scale,
        ..PlanOptions::default()
    };
    let run = coordinator
        .ensure_consistency(&agents, options)
        .await
        .context("Consistency run failed")?;

    let after = coordinator
        .verify_consistency(&agents, &verification)
        .await
        .context("Final verification failed")?;

    let mut metrics = BTreeMap::new();
    for agent in &agents {
        let agent_metrics = agent
            .metrics()
            .await
            .with_context(|| format!("Agent {} stopped", agent.id()))?;
        metrics.insert(agent.id().to_string(), agent_metrics);
    }

    let report = json!({
        "run_id": run.run_id,
        "status": run.result.status,
        "batches": run.plan.batch_count,
        "batches_run": run.result.batches.len(),
        "elapsed_ms": run.result.elapsed_ms,
        "global_version": run.global_version,
        "missing": run.missing,
        "before": before,
        "after": after,
        "agents": metrics,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to encode report")?
    );

    debug!(metrics = %gather_metrics().context("Failed to gather metrics")?, "Prometheus snapshot");
    info!(consistent = after.consistent, "Simulation finished");
    Ok(())
}
