//! # Configuration Container
//!
//! Agent, update and binary configuration with environment overrides.

pub mod config;

pub use config::{AgentConfig, AgentConfigUpdate, ConfigError, RuntimeConfig};
