//! The courier agent runtime.
//!
//! An [`Agent`] owns a [`World`](courier_belief::World) and an
//! [`IntentionScheduler`](courier_intent::IntentionScheduler), each behind its own mutex, and runs
//! four tasks once spawned:
//!
//! - perception: applies [`SenseEvent`](courier_belief::SenseEvent)s and replans;
//! - scheduler: drops invalid heads, runs the head intention's plan, settles it;
//! - peer messages: answers conflict queries and merges state syncs;
//! - broadcast: periodic state sync to the peer.
//!
//! Every task locks the world before the scheduler and none holds a lock across an actuator call
//! or a peer question.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod config;
pub mod runtime;

pub use config::AgentConfig;
pub use runtime::{Agent, AgentHandle};
