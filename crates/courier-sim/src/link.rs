use std::time::Duration;

use async_trait::async_trait;
use courier_core::AgentId;
use courier_negotiate::{Envelope, NegotiationError, PeerLink};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// One direction of an in-process peer connection.
pub struct LocalLink {
    from: AgentId,
    tx: mpsc::Sender<Envelope>,
}

pub type Inbox = mpsc::Receiver<Envelope>;

impl LocalLink {
    /// Two connected ends: what `a` says arrives in the second inbox, and vice versa.
    pub fn pair(a: AgentId, b: AgentId, capacity: usize) -> ((LocalLink, Inbox), (LocalLink, Inbox)) {
        let (to_b, inbox_b) = mpsc::channel(capacity);
        let (to_a, inbox_a) = mpsc::channel(capacity);
        (
            (LocalLink { from: a, tx: to_b }, inbox_a),
            (LocalLink { from: b, tx: to_a }, inbox_b),
        )
    }
}

#[async_trait]
impl PeerLink for LocalLink {
    async fn say(&self, payload: Value) -> Result<(), NegotiationError> {
        self.tx
            .send(Envelope::new(self.from.clone(), payload))
            .await
            .map_err(|_| NegotiationError::Link("peer inbox closed".into()))
    }

    async fn ask(&self, payload: Value, timeout: Duration) -> Result<Value, NegotiationError> {
        let (reply, answer) = oneshot::channel();
        self.tx
            .send(Envelope::with_reply(self.from.clone(), payload, reply))
            .await
            .map_err(|_| NegotiationError::Link("peer inbox closed".into()))?;
        match tokio::time::timeout(timeout, answer).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(NegotiationError::Link("peer dropped the question".into())),
            Err(_) => Err(NegotiationError::Timeout(timeout)),
        }
    }
}
