//! A small in-process stand-in for the delivery game server.
//!
//! [`LocalSim`] owns the true grid state: items with decaying rewards, agents and their scores.
//! Each agent gets a [`SimActuator`] to act and a sensor task that streams
//! [`SenseEvent`](courier_belief::SenseEvent)s. [`LocalLink`] connects two agents for negotiation.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod link;
pub mod scenario;
pub mod sim;

pub use link::{Inbox, LocalLink};
pub use scenario::{AgentSpec, ItemSpec, Scenario, SpawnPolicy};
pub use sim::{LocalSim, SimActuator};
