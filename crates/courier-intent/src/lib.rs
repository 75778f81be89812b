//! Deciding what to do next.
//!
//! [`generate_options`] turns the current [`World`](courier_belief::World) into a single
//! [`Goal`]; [`IntentionScheduler`] keeps every committed goal in a score-ordered queue and stops
//! the running one when something better shows up.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod goal;
pub mod options;
pub mod scheduler;
pub mod score;

pub use goal::{still_valid, Goal, GoalKey};
pub use options::generate_options;
pub use scheduler::{Intention, IntentionId, IntentionScheduler, IntentionState, PushOutcome};
pub use score::{score, route_is_current, ScoreConfig, ScoreContext};
