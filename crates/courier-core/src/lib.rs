//! Shared primitives for the courier delivery agent.
//!
//! Everything here is plain data plus a few small helpers: grid geometry, tile maps, identities,
//! timestamps, simulation parameters and cooperative cancellation. Higher-level crates (nav,
//! belief, intent, plan, negotiate) build on these types.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod geom;
pub mod ids;
pub mod rng;
pub mod tile;
pub mod time;

pub use cancel::CancelToken;
pub use config::{parse_decay_interval, DecayInterval, SimConfig};
pub use error::ConfigError;
pub use geom::{Cell, Direction, Position};
pub use ids::{AgentId, ItemId};
pub use rng::{DeterministicRng, SplitMix64};
pub use tile::{Tile, TileKind, TileMap};
pub use time::Timestamp;
