//! Perception events delivered by the sense/act layer.

use courier_core::{AgentId, ItemId, Position, SimConfig, TileMap};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfSighting {
    pub id: AgentId,
    #[serde(default)]
    pub name: Option<String>,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub score: i64,
}

impl SelfSighting {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSighting {
    pub id: ItemId,
    pub x: f64,
    pub y: f64,
    pub reward: u32,
    #[serde(default, rename = "carriedBy", alias = "carried_by")]
    pub carried_by: Option<AgentId>,
}

impl ItemSighting {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSighting {
    pub id: AgentId,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub score: i64,
}

impl AgentSighting {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SenseEvent {
    Config(SimConfig),
    Map(TileMap),
    You(SelfSighting),
    Items(Vec<ItemSighting>),
    Agents(Vec<AgentSighting>),
}

impl SenseEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SenseEvent::Config(_) => "config",
            SenseEvent::Map(_) => "map",
            SenseEvent::You(_) => "you",
            SenseEvent::Items(_) => "items",
            SenseEvent::Agents(_) => "agents",
        }
    }
}
