//! YAML scenario files: a map, game parameters, starting items and agents.

use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use courier_core::{AgentId, Cell, SimConfig, TileMap};
use serde::{Deserialize, Serialize};

use crate::{LocalSim, SimActuator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub x: i32,
    pub y: i32,
    pub reward: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    pub x: i32,
    pub y: i32,
}

/// Random item generation on spawner tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnPolicy {
    #[serde(default = "default_spawn_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_reward_min")]
    pub reward_min: u32,

    #[serde(default = "default_reward_max")]
    pub reward_max: u32,

    /// Free items on the map above which nothing new spawns.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_spawn_interval_ms() -> u64 {
    2_000
}
fn default_reward_min() -> u32 {
    10
}
fn default_reward_max() -> u32 {
    30
}
fn default_max_items() -> usize {
    5
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_spawn_interval_ms(),
            reward_min: default_reward_min(),
            reward_max: default_reward_max(),
            max_items: default_max_items(),
        }
    }
}

impl SpawnPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Map rows, top first. See [`TileMap::from_rows`] for the tile characters.
    pub map: Vec<String>,

    pub sim: SimConfig,

    pub items: Vec<ItemSpec>,

    pub agents: Vec<AgentSpec>,

    /// Leave unset for a fixed set of items.
    pub spawn: Option<SpawnPolicy>,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// How often each agent's sensor reports.
    #[serde(default = "default_sense_interval_ms")]
    pub sense_interval_ms: u64,
}

fn default_seed() -> u64 {
    7
}
fn default_sense_interval_ms() -> u64 {
    100
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            map: Vec::new(),
            sim: SimConfig::default(),
            items: Vec::new(),
            agents: Vec::new(),
            spawn: None,
            seed: default_seed(),
            sense_interval_ms: default_sense_interval_ms(),
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario from {}", path.display()))?;
        let scenario = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse scenario from {}", path.display()))?;
        Ok(scenario)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn tile_map(&self) -> TileMap {
        let rows: Vec<&str> = self.map.iter().map(String::as_str).collect();
        TileMap::from_rows(&rows)
    }

    pub fn sense_interval(&self) -> Duration {
        Duration::from_millis(self.sense_interval_ms.max(1))
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.map.is_empty(), "scenario map has no rows");
        let map = self.tile_map();
        for item in &self.items {
            let cell = Cell::new(item.x, item.y);
            ensure!(
                map.is_traversable(cell),
                "item at {cell} is not on a walkable tile"
            );
        }
        for (i, agent) in self.agents.iter().enumerate() {
            let cell = Cell::new(agent.x, agent.y);
            ensure!(
                map.is_traversable(cell),
                "agent {} starts on blocked tile {cell}",
                agent.id
            );
            ensure!(
                !self.agents[..i].iter().any(|a| a.id == agent.id),
                "agent id {} is used twice",
                agent.id
            );
        }
        if let Some(spawn) = &self.spawn {
            ensure!(
                spawn.reward_min <= spawn.reward_max,
                "spawn reward_min {} exceeds reward_max {}",
                spawn.reward_min,
                spawn.reward_max
            );
        }
        Ok(())
    }

    /// Create the simulator, its starting items and one actuator per listed agent.
    ///
    /// Agents after the first `limit` are left out.
    pub async fn build(&self, limit: usize) -> Result<(LocalSim, Vec<SimActuator>)> {
        let sim = LocalSim::new(self.tile_map(), self.sim.clone(), self.seed);
        for item in &self.items {
            let cell = Cell::new(item.x, item.y);
            sim.spawn_item(cell, item.reward)
                .await
                .with_context(|| format!("Failed to place item at {cell}"))?;
        }
        let mut actuators = Vec::new();
        for agent in self.agents.iter().take(limit) {
            let cell = Cell::new(agent.x, agent.y);
            let actuator = sim
                .add_agent(AgentId::new(agent.id.clone()), cell)
                .await
                .with_context(|| format!("Failed to place agent {} at {cell}", agent.id))?;
            actuators.push(actuator);
        }
        Ok((sim, actuators))
    }
}
