use std::sync::Arc;
use std::time::Duration;

use courier_belief::World;
use courier_core::ItemId;
use courier_intent::{GoalKey, IntentionScheduler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    answer_conflict, decode, encode, merge_state_sync, state_sync, Answer, Envelope,
    NegotiationError, PeerLink, PeerMessage, Role,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,

    #[serde(default = "default_ask_timeout_ms")]
    pub ask_timeout_ms: u64,

    /// Answer "no" when we have no pickup intention for the queried item.
    #[serde(default = "default_deny_uncontested")]
    pub deny_uncontested: bool,

    /// Fixed role; derived from the agent ids when unset.
    pub role: Option<Role>,
}

fn default_broadcast_interval_ms() -> u64 {
    1_000
}
fn default_ask_timeout_ms() -> u64 {
    1_000
}
fn default_deny_uncontested() -> bool {
    true
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: default_broadcast_interval_ms(),
            ask_timeout_ms: default_ask_timeout_ms(),
            deny_uncontested: default_deny_uncontested(),
            role: None,
        }
    }
}

impl NegotiationConfig {
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    pub fn ask_timeout(&self) -> Duration {
        Duration::from_millis(self.ask_timeout_ms)
    }
}

/// What handling an incoming envelope did.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Synced { changed: bool },
    Deleted { id: ItemId, known: bool },
    Answered { item: ItemId, answer: Answer },
    Ignored,
}

impl Incoming {
    /// Whether goals should be regenerated.
    pub fn replan(&self) -> bool {
        match self {
            Incoming::Synced { changed } => *changed,
            Incoming::Deleted { known, .. } => *known,
            Incoming::Answered { answer, .. } => *answer == Answer::Yes,
            Incoming::Ignored => false,
        }
    }
}

/// One agent's end of the peer protocol.
pub struct NegotiationChannel {
    link: Arc<dyn PeerLink>,
    role: Role,
    config: NegotiationConfig,
}

impl NegotiationChannel {
    pub fn new(link: Arc<dyn PeerLink>, role: Role, config: NegotiationConfig) -> Self {
        Self { link, role, config }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &NegotiationConfig {
        &self.config
    }

    pub async fn broadcast(&self, world: &Mutex<World>) -> Result<(), NegotiationError> {
        let message = state_sync(&*world.lock().await);
        self.link.say(encode(&message)).await
    }

    /// Announce items we saw vanish. Link failures are logged, not returned.
    pub async fn notify_deleted(&self, ids: &[ItemId]) {
        for id in ids {
            let message = PeerMessage::DeleteItem { id: id.clone() };
            if let Err(err) = self.link.say(encode(&message)).await {
                debug!(item = %id, error = %err, "delete notice not sent");
            }
        }
    }

    /// Ask the primary whether we may pick up `item`. The primary never asks.
    ///
    /// A missing, late or unreadable reply counts as "no".
    pub async fn ask_permission(&self, item: &ItemId, score: f64) -> bool {
        if self.role == Role::Primary {
            return true;
        }
        let query = PeerMessage::ConflictQuery {
            item: item.clone(),
            score,
        };
        let reply = match self.link.ask(encode(&query), self.config.ask_timeout()).await {
            Ok(reply) => reply,
            Err(err) => {
                debug!(item = %item, error = %err, "conflict query unanswered");
                return false;
            }
        };
        match decode(reply) {
            Ok(PeerMessage::ConflictReply { answer }) => answer == Answer::Yes,
            Ok(other) => {
                warn!(kind = other.kind(), "unexpected reply to conflict query");
                false
            }
            Err(err) => {
                warn!(error = %err, "unreadable conflict reply");
                false
            }
        }
    }

    /// Ask for `item` and, on refusal, exclude it from local pickup.
    pub async fn claim(&self, world: &Mutex<World>, item: &ItemId, score: f64) -> bool {
        let granted = self.ask_permission(item, score).await;
        if !granted {
            info!(item = %item, score, "peer keeps item");
            world.lock().await.beliefs.mark_assigned_elsewhere(item);
        }
        granted
    }

    /// Apply one message from the peer. Locks `world` before `scheduler`.
    pub async fn handle_incoming(
        &self,
        envelope: Envelope,
        world: &Mutex<World>,
        scheduler: &Mutex<IntentionScheduler>,
    ) -> Result<Incoming, NegotiationError> {
        let Envelope {
            from,
            payload,
            reply,
        } = envelope;
        let message = decode(payload)?;
        debug!(from = %from, kind = message.kind(), "peer message");

        match message {
            PeerMessage::StateSync {
                free_items,
                peer_agents,
            } => {
                let mut world = world.lock().await;
                let changed = merge_state_sync(&mut world, &free_items, &peer_agents);
                Ok(Incoming::Synced { changed })
            }
            PeerMessage::DeleteItem { id } => {
                let mut world = world.lock().await;
                let known = world.beliefs.forget_item(&id);
                scheduler
                    .lock()
                    .await
                    .drop_goal(&GoalKey::PickUp(id.clone()));
                Ok(Incoming::Deleted { id, known })
            }
            PeerMessage::ConflictQuery { item, score } => {
                let mut world = world.lock().await;
                let mut scheduler = scheduler.lock().await;
                let own = scheduler.top_pickup_for(&item).map(|i| i.score);
                let answer = answer_conflict(score, own, self.config.deny_uncontested);
                if answer == Answer::Yes {
                    scheduler.drop_goal(&GoalKey::PickUp(item.clone()));
                    world.beliefs.mark_assigned_elsewhere(&item);
                }
                drop(scheduler);
                drop(world);
                info!(from = %from, item = %item, asker = score, own = ?own, answer = ?answer, "conflict query answered");

                let response = encode(&PeerMessage::ConflictReply { answer });
                match reply {
                    Some(tx) => {
                        if tx.send(response).is_err() {
                            debug!(item = %item, "asker gave up before the reply");
                        }
                    }
                    None => warn!(item = %item, "conflict query without a reply channel"),
                }
                Ok(Incoming::Answered { item, answer })
            }
            PeerMessage::ConflictReply { .. } => {
                debug!(from = %from, "unsolicited conflict reply");
                Ok(Incoming::Ignored)
            }
        }
    }
}
