//! Turning goals into actuator calls.
//!
//! A [`PlanLibrary`] is an ordered table of strategies. [`PlanLibrary::execute`] runs every entry
//! that applies to a goal until one succeeds; each strategy drives the agent through the
//! [`Actuator`] trait and polls its [`CancelToken`](courier_core::CancelToken) around every call.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod actuator;
pub mod context;
pub mod error;
pub mod library;
pub mod navigate;
mod plans;

pub use actuator::{ActError, Actuator};
pub use context::{PlanContext, PlanLimits};
pub use error::PlanError;
pub use library::{PlanEntry, PlanFn, PlanLibrary};
pub use navigate::navigate;
