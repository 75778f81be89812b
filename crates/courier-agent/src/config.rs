//! Agent configuration, loaded from YAML.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use courier_intent::ScoreConfig;
use courier_negotiate::NegotiationConfig;
use courier_plan::PlanLimits;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Global seed; each agent derives its own exploration stream from it.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Upper bound on how long the scheduler sleeps with an empty queue.
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Agents out of sight for longer than this are forgotten.
    #[serde(default = "default_agent_expiry_ms")]
    pub agent_expiry_ms: u64,

    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Capacity of the perception queue.
    #[serde(default = "default_sense_buffer")]
    pub sense_buffer: usize,

    pub score: ScoreConfig,

    pub negotiation: NegotiationConfig,

    pub plan: PlanLimits,
}

fn default_seed() -> u64 {
    0
}
fn default_idle_poll_ms() -> u64 {
    250
}
fn default_agent_expiry_ms() -> u64 {
    10_000
}
fn default_candidate_limit() -> usize {
    8
}
fn default_sense_buffer() -> usize {
    64
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            idle_poll_ms: default_idle_poll_ms(),
            agent_expiry_ms: default_agent_expiry_ms(),
            candidate_limit: default_candidate_limit(),
            sense_buffer: default_sense_buffer(),
            score: ScoreConfig::default(),
            negotiation: NegotiationConfig::default(),
            plan: PlanLimits::default(),
        }
    }
}

impl AgentConfig {
    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read agent config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse agent config from {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms.max(1))
    }

    pub fn agent_expiry(&self) -> Duration {
        Duration::from_millis(self.agent_expiry_ms)
    }
}
