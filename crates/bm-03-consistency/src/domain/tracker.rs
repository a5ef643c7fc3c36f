//! Consistency bookkeeping: per-agent versions, sync times and a capped
//! convergence history (most recent first).

use serde::{Deserialize, Serialize};
use shared_types::{now_ms, AgentId, Timestamp};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// Convergence samples kept.
pub const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceSample {
    pub timestamp: Timestamp,
    pub score: f64,
    pub global_version: u64,
}

/// Single-owner tracker. Concurrent callers must serialise access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsistencyTracker {
    global_version: u64,
    agent_versions: BTreeMap<AgentId, u64>,
    last_sync_times: BTreeMap<AgentId, Timestamp>,
    history: VecDeque<ConvergenceSample>,
}

impl ConsistencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global_version(&self) -> u64 {
        self.global_version
    }

    /// Bumps and returns the global version.
    pub fn increment_global_version(&mut self) -> u64 {
        self.global_version += 1;
        self.global_version
    }

    pub fn update_agent_version(&mut self, agent: AgentId, version: u64) {
        self.update_agent_version_at(agent, version, now_ms());
    }

    pub fn update_agent_version_at(&mut self, agent: AgentId, version: u64, now: Timestamp) {
        self.last_sync_times.insert(agent.clone(), now);
        self.agent_versions.insert(agent, version);
    }

    pub fn agent_version(&self, agent: &AgentId) -> Option<u64> {
        self.agent_versions.get(agent).copied()
    }

    pub fn last_sync_time(&self, agent: &AgentId) -> Option<Timestamp> {
        self.last_sync_times.get(agent).copied()
    }

    pub fn record_convergence_check(&mut self, score: f64, global_version: u64) {
        self.record_convergence_check_at(score, global_version, now_ms());
    }

    pub fn record_convergence_check_at(&mut self, score: f64, global_version: u64, now: Timestamp) {
        self.history.push_front(ConvergenceSample {
            timestamp: now,
            score,
            global_version,
        });
        self.history.truncate(MAX_HISTORY);
    }

    /// Samples, most recent first.
    pub fn history(&self) -> impl Iterator<Item = &ConvergenceSample> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn latest_score(&self) -> Option<f64> {
        self.history.front().map(|s| s.score)
    }

    /// The `n` most recent scores, most recent first.
    pub fn convergence_trend(&self, n: usize) -> Vec<f64> {
        self.history.iter().take(n).map(|s| s.score).collect()
    }

    /// Agents more than `max_lag` versions behind the global version.
    pub fn detect_lagging_agents(&self, max_lag: u64) -> Vec<AgentId> {
        self.agent_versions
            .iter()
            .filter(|(_, &version)| self.global_version.saturating_sub(version) > max_lag)
            .map(|(agent, _)| agent.clone())
            .collect()
    }

    pub fn detect_stale_agents(&self, max_age: Duration) -> Vec<AgentId> {
        self.detect_stale_agents_at(max_age, now_ms())
    }

    /// Agents whose last sync is older than `max_age` at `now`.
    pub fn detect_stale_agents_at(&self, max_age: Duration, now: Timestamp) -> Vec<AgentId> {
        let max_age_ms = max_age.as_millis() as u64;
        self.last_sync_times
            .iter()
            .filter(|(_, &synced)| now.saturating_sub(synced) > max_age_ms)
            .map(|(agent, _)| agent.clone())
            .collect()
    }
}
