use std::time::Duration;

use async_trait::async_trait;
use courier_core::AgentId;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::NegotiationError;

/// Transport to the peer agent.
#[async_trait]
pub trait PeerLink: Send + Sync {
    /// Fire-and-forget.
    async fn say(&self, payload: Value) -> Result<(), NegotiationError>;

    /// Request/response; fails with [`NegotiationError::Timeout`] when nothing comes back in time.
    async fn ask(&self, payload: Value, timeout: Duration) -> Result<Value, NegotiationError>;
}

/// One incoming message. `reply` is set when the sender is waiting for an answer.
#[derive(Debug)]
pub struct Envelope {
    pub from: AgentId,
    pub payload: Value,
    pub reply: Option<oneshot::Sender<Value>>,
}

impl Envelope {
    pub fn new(from: AgentId, payload: Value) -> Self {
        Self {
            from,
            payload,
            reply: None,
        }
    }

    pub fn with_reply(from: AgentId, payload: Value, reply: oneshot::Sender<Value>) -> Self {
        Self {
            from,
            payload,
            reply: Some(reply),
        }
    }
}
