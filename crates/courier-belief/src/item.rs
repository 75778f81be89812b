use courier_core::{AgentId, Cell, ItemId, Timestamp};
use serde::{Deserialize, Serialize};

/// A free item lying on the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub cell: Cell,
    pub reward: u32,
    /// Last time the item was seen (by us or by the peer that reported it).
    pub observed_at: Timestamp,
    /// Reward is exact as of this instant; decay is counted from here.
    pub decayed_at: Timestamp,
    pub carrier: Option<AgentId>,
}

impl Item {
    pub fn new(id: ItemId, cell: Cell, reward: u32, now: Timestamp) -> Self {
        Self {
            id,
            cell,
            reward,
            observed_at: now,
            decayed_at: now,
            carrier: None,
        }
    }
}

/// An item held by this agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriedItem {
    pub id: ItemId,
    pub reward: u32,
    pub picked_at: Timestamp,
    pub decayed_at: Timestamp,
}

impl CarriedItem {
    pub fn new(id: ItemId, reward: u32, now: Timestamp) -> Self {
        Self {
            id,
            reward,
            picked_at: now,
            decayed_at: now,
        }
    }
}
