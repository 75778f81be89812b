//! Wire format of peer messages.

use std::collections::BTreeMap;

use courier_belief::{AgentBelief, Item};
use courier_core::{AgentId, ItemId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NegotiationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

/// An agent record as shared with the peer. The sender describes itself with `self: true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    #[serde(flatten)]
    pub belief: AgentBelief,
    #[serde(rename = "self", default)]
    pub is_self: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PeerMessage {
    /// Periodic snapshot of the sender's beliefs
    StateSync {
        #[serde(rename = "free-items")]
        free_items: BTreeMap<ItemId, Item>,
        #[serde(rename = "peer-agents")]
        peer_agents: BTreeMap<AgentId, AgentSnapshot>,
    },
    /// The sender saw this item disappear
    DeleteItem { id: ItemId },
    /// The sender wants to pick up `item` and values it at `score`
    ConflictQuery { item: ItemId, score: f64 },
    /// Answer to a conflict query
    ConflictReply { answer: Answer },
}

impl PeerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::StateSync { .. } => "state-sync",
            PeerMessage::DeleteItem { .. } => "delete-item",
            PeerMessage::ConflictQuery { .. } => "conflict-query",
            PeerMessage::ConflictReply { .. } => "conflict-reply",
        }
    }
}

pub fn encode(message: &PeerMessage) -> Value {
    // Every field is a plain map, string or number, so this cannot fail.
    serde_json::to_value(message).unwrap_or(Value::Null)
}

pub fn decode(payload: Value) -> Result<PeerMessage, NegotiationError> {
    serde_json::from_value(payload).map_err(|e| NegotiationError::Malformed(e.to_string()))
}
