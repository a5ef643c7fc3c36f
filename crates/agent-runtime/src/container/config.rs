//! # Runtime Configuration
//!
//! Per-agent settings, their partial updates, and the settings of the
//! simulation binary. Every struct has a usable `Default`; environment
//! variables override individual fields.

use bm_01_belief_model::ResolutionStrategy;
use bm_02_propagation::{PropagationConfig, PropagationMode};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("acceptance threshold {0} outside [0, 1]")]
    ThresholdOutOfRange(f64),

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("time scale {0} must be finite and not negative")]
    InvalidTimeScale(f64),

    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

/// Settings of one agent actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Minimum confidence for a belief id the agent has never seen.
    pub acceptance_threshold: f64,
    pub conflict_strategy: ResolutionStrategy,
    pub propagation_mode: PropagationMode,
    /// Per-target acknowledgement timeout for sync propagation.
    pub propagation_timeout: Duration,
    /// Period of automatic neighbor sync; `None` disables it.
    pub sync_interval: Option<Duration>,
    /// Upper bound on fetching a neighbor's set during sync.
    pub sync_timeout: Duration,
    /// Push freshly authored beliefs to all neighbors.
    pub auto_propagate: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.5,
            conflict_strategy: ResolutionStrategy::HighestConfidence,
            propagation_mode: PropagationMode::Async,
            propagation_timeout: Duration::from_millis(5_000),
            sync_interval: Some(Duration::from_millis(5_000)),
            sync_timeout: Duration::from_millis(5_000),
            auto_propagate: false,
        }
    }
}

impl AgentConfig {
    /// Defaults overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BM_ACCEPTANCE_THRESHOLD`: float in `[0, 1]`
    /// - `BM_CONFLICT_STRATEGY`: strategy name (unknown names fall back to
    ///   `highest_confidence`)
    /// - `BM_PROPAGATION_MODE`: `async` or `sync`
    /// - `BM_PROPAGATION_TIMEOUT_MS`, `BM_SYNC_TIMEOUT_MS`: milliseconds
    /// - `BM_SYNC_INTERVAL_MS`: milliseconds, `0` disables periodic sync
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(threshold) = env_parse::<f64>("BM_ACCEPTANCE_THRESHOLD")? {
            config.acceptance_threshold = threshold;
        }
        if let Ok(name) = env::var("BM_CONFLICT_STRATEGY") {
            config.conflict_strategy = ResolutionStrategy::from_name(&name);
        }
        if let Ok(mode) = env::var("BM_PROPAGATION_MODE") {
            config.propagation_mode = mode.parse().map_err(|_| ConfigError::Invalid {
                name: "BM_PROPAGATION_MODE",
                value: mode.clone(),
            })?;
        }
        if let Some(ms) = env_parse::<u64>("BM_PROPAGATION_TIMEOUT_MS")? {
            config.propagation_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("BM_SYNC_TIMEOUT_MS")? {
            config.sync_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("BM_SYNC_INTERVAL_MS")? {
            config.sync_interval = (ms > 0).then(|| Duration::from_millis(ms));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.acceptance_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.acceptance_threshold));
        }
        if self.sync_timeout.is_zero() {
            return Err(ConfigError::Zero {
                name: "sync_timeout",
            });
        }
        if self.propagation_timeout.is_zero() {
            return Err(ConfigError::Zero {
                name: "propagation_timeout",
            });
        }
        Ok(())
    }

    pub fn propagation(&self) -> PropagationConfig {
        PropagationConfig {
            mode: self.propagation_mode,
            timeout: self.propagation_timeout,
        }
    }
}

/// Partial update applied by the `update-config` message.
///
/// Absent fields leave the current value untouched. Deserializes from a
/// JSON map such as `{"acceptance_threshold": 0.7}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfigUpdate {
    pub acceptance_threshold: Option<f64>,
    pub conflict_strategy: Option<ResolutionStrategy>,
    pub propagation_mode: Option<PropagationMode>,
    pub propagation_timeout_ms: Option<u64>,
    /// `Some(0)` disables periodic sync.
    pub sync_interval_ms: Option<u64>,
    pub sync_timeout_ms: Option<u64>,
    pub auto_propagate: Option<bool>,
}

impl AgentConfigUpdate {
    /// Returns the updated configuration, or an error leaving `current`
    /// as it was.
    pub fn apply(&self, current: &AgentConfig) -> Result<AgentConfig, ConfigError> {
        let mut next = current.clone();
        if let Some(threshold) = self.acceptance_threshold {
            next.acceptance_threshold = threshold;
        }
        if let Some(strategy) = self.conflict_strategy {
            next.conflict_strategy = strategy;
        }
        if let Some(mode) = self.propagation_mode {
            next.propagation_mode = mode;
        }
        if let Some(ms) = self.propagation_timeout_ms {
            next.propagation_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.sync_interval_ms {
            next.sync_interval = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(ms) = self.sync_timeout_ms {
            next.sync_timeout = Duration::from_millis(ms);
        }
        if let Some(flag) = self.auto_propagate {
            next.auto_propagate = flag;
        }
        next.validate()?;
        Ok(next)
    }
}

/// Settings of the `belief-mesh` simulation binary.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Population size.
    pub agents: usize,
    pub batch_size: usize,
    pub max_time_ms: u64,
    pub sync_interval_ms: u64,
    /// Scales plan batch windows; 0 runs batches back to back.
    pub time_scale: f64,
    pub agent: AgentConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            agents: 5,
            batch_size: 3,
            max_time_ms: 30_000,
            sync_interval_ms: 1_000,
            time_scale: 0.01,
            agent: AgentConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// # Environment Variables
    ///
    /// - `BM_AGENTS`, `BM_BATCH_SIZE`, `BM_MAX_TIME_MS`, `BM_PLAN_INTERVAL_MS`
    /// - `BM_TIME_SCALE`
    /// - everything [`AgentConfig::from_env`] reads
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            agent: AgentConfig::from_env()?,
            ..Self::default()
        };
        if let Some(agents) = env_parse("BM_AGENTS")? {
            config.agents = agents;
        }
        if let Some(batch_size) = env_parse("BM_BATCH_SIZE")? {
            config.batch_size = batch_size;
        }
        if let Some(max_time_ms) = env_parse("BM_MAX_TIME_MS")? {
            config.max_time_ms = max_time_ms;
        }
        if let Some(interval) = env_parse("BM_PLAN_INTERVAL_MS")? {
            config.sync_interval_ms = interval;
        }
        if let Some(scale) = env_parse("BM_TIME_SCALE")? {
            config.time_scale = scale;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents == 0 {
            return Err(ConfigError::Zero { name: "agents" });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero { name: "batch_size" });
        }
        if self.max_time_ms == 0 {
            return Err(ConfigError::Zero {
                name: "max_time_ms",
            });
        }
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(ConfigError::InvalidTimeScale(self.time_scale));
        }
        self.agent.validate()
    }
}

fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(None),
    }
}
