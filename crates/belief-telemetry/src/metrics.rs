//! Prometheus metrics for Belief-Mesh.
//!
//! All metrics follow the naming convention: `bm_<metric>_<unit>`. They are
//! process-wide; per-agent numbers live in the runtime's `AgentMetrics`.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Inbound belief updates by admission outcome (accepted/rejected)
    pub static ref UPDATES_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("bm_updates_received_total", "Inbound belief updates by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Atoms handed to peers by propagation
    pub static ref BELIEFS_SENT: Counter = Counter::new(
        "bm_beliefs_sent_total",
        "Belief atoms sent to peers"
    ).expect("metric creation failed");

    /// Conflicts settled by a resolver during admission or merge
    pub static ref CONFLICTS_RESOLVED: Counter = Counter::new(
        "bm_conflicts_resolved_total",
        "Belief conflicts resolved"
    ).expect("metric creation failed");

    /// Neighbor sync rounds (success/failed)
    pub static ref SYNC_ROUNDS: CounterVec = CounterVec::new(
        Opts::new("bm_sync_rounds_total", "Neighbor synchronisation rounds by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Most recent population convergence score
    pub static ref CONVERGENCE_SCORE: Gauge = Gauge::new(
        "bm_convergence_score",
        "Latest population convergence score (0..1)"
    ).expect("metric creation failed");

    /// Wall time of whole-population synchronisation plans
    pub static ref PLAN_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "bm_plan_duration_seconds",
            "Time spent executing synchronisation plans"
        ).buckets(exponential_buckets(0.001, 2.0, 16).expect("bucket layout"))
    ).expect("metric creation failed");
}

/// Register all metrics with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(UPDATES_RECEIVED.clone()),
        Box::new(BELIEFS_SENT.clone()),
        Box::new(CONFLICTS_RESOLVED.clone()),
        Box::new(SYNC_ROUNDS.clone()),
        Box::new(CONVERGENCE_SCORE.clone()),
        Box::new(PLAN_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Observes elapsed time into a histogram on drop.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
