//! # Belief Telemetry
//!
//! Logging and metrics for Belief-Mesh processes.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with an env filter; pretty output in
//!   development, JSON in containers
//! - **Metrics**: process-wide Prometheus counters exported as text by
//!   [`gather_metrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use belief_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(TelemetryConfig::from_env())?;
//!     // Agents now log and count
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `belief-mesh` | Service name in logs |
//! | `BM_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `BM_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `BM_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    gather_metrics, register_metrics, HistogramTimer, BELIEFS_SENT, CONFLICTS_RESOLVED,
    CONVERGENCE_SCORE, PLAN_DURATION, SYNC_ROUNDS, UPDATES_RECEIVED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Register metrics and install the global log subscriber.
///
/// Call once per process; a second call fails with
/// [`TelemetryError::TracerInit`] because the subscriber is already set.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    tracing_setup::init_tracing(&config)?;
    Ok(())
}
