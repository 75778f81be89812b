//! Peer coordination.
//!
//! Two agents share beliefs with a periodic [`PeerMessage::StateSync`], announce vanished items
//! with [`PeerMessage::DeleteItem`], and settle contested pickups with a conflict query: the
//! secondary asks, the primary answers.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod channel;
pub mod error;
pub mod link;
pub mod message;
pub mod role;
pub mod sync;

pub use channel::{Incoming, NegotiationChannel, NegotiationConfig};
pub use error::NegotiationError;
pub use link::{Envelope, PeerLink};
pub use message::{decode, encode, AgentSnapshot, Answer, PeerMessage};
pub use role::{answer_conflict, role_for, Role};
pub use sync::{merge_state_sync, state_sync};
