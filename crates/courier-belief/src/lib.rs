//! The agent's model of the world.
//!
//! [`BeliefStore`] is the single writer of everything the agent believes about items, carried
//! items and other agents. [`World`] bundles it with the navigation graph, the tile map and the
//! exploration bookkeeping; it is the context object every other component reads.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod item;
pub mod perception;
pub mod store;
pub mod world;

pub use agent::{AgentBelief, Visibility};
pub use item::{CarriedItem, Item};
pub use perception::{AgentSighting, ItemSighting, SelfSighting, SenseEvent};
pub use store::{AgentUpdate, BeliefStore, ItemUpdate, SelfState};
pub use world::{Applied, World};
