//! Navigation over the delivery grid.
//!
//! [`NavGraph`] keeps one node per traversable, unreserved cell and the 4-neighbour edges between
//! them. Other agents reserve the cells they occupy through [`NavGraph::block`]; releasing a
//! reservation restores exactly the edges allowed by the tile map and every other reservation.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod candidates;
pub mod graph;
pub mod route;

pub use candidates::candidate_cells;
pub use graph::{NavGraph, PathTree};
pub use route::Route;
