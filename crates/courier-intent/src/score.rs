//! Goal utility.

use courier_belief::World;
use courier_core::Timestamp;
use courier_nav::Route;
use serde::{Deserialize, Serialize};

use crate::Goal;

/// Tunable scoring constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Score of wandering around when nothing else is worth doing.
    #[serde(default = "default_idle_score")]
    pub idle_score: f64,

    /// Score of a goal whose route is missing or stale. Kept below idle.
    #[serde(default = "default_unroutable_score")]
    pub unroutable_score: f64,

    /// Per-step penalty in the pickup denominator.
    #[serde(default = "default_distance_weight")]
    pub distance_weight: f64,

    /// Carried value at which delivering takes priority over picking up more.
    #[serde(default = "default_deliver_threshold")]
    pub deliver_threshold: u32,
}

fn default_idle_score() -> f64 {
    1.0
}
fn default_unroutable_score() -> f64 {
    0.5
}
fn default_distance_weight() -> f64 {
    0.1
}
fn default_deliver_threshold() -> u32 {
    1
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            idle_score: default_idle_score(),
            unroutable_score: default_unroutable_score(),
            distance_weight: default_distance_weight(),
            deliver_threshold: default_deliver_threshold(),
        }
    }
}

/// Everything scoring reads.
#[derive(Clone, Copy)]
pub struct ScoreContext<'a> {
    pub world: &'a World,
    pub config: &'a ScoreConfig,
    pub now: Timestamp,
}

impl<'a> ScoreContext<'a> {
    pub fn new(world: &'a World, config: &'a ScoreConfig, now: Timestamp) -> Self {
        Self { world, config, now }
    }
}

/// A route is current when it starts where we stand and every cell is still in the graph.
pub fn route_is_current(route: &Route, world: &World) -> bool {
    match (route.start(), world.my_cell()) {
        (Some(start), Some(me)) if start == me => route.cells.iter().all(|c| world.graph.contains(*c)),
        _ => false,
    }
}

/// Utility of pursuing `goal` right now. Never negative, never NaN.
pub fn score(goal: &Goal, ctx: &ScoreContext<'_>) -> f64 {
    let world = ctx.world;
    let cfg = ctx.config;

    if let Goal::Idle = goal {
        return cfg.idle_score;
    }
    let Some(route) = goal.route().filter(|r| route_is_current(r, world)) else {
        return cfg.unroutable_score;
    };
    let steps = f64::from(route.cost);
    let per_step = world.config().decay_per_step();

    let value = match goal {
        Goal::PickUp { item, .. } => {
            let Some(item) = world.beliefs.item(item) else {
                return cfg.unroutable_score;
            };
            if route.end() != Some(item.cell) {
                return cfg.unroutable_score;
            }
            let since_seen = world
                .config()
                .decay_interval
                .rate_over(ctx.now.elapsed_since(item.decayed_at));
            let expected = f64::from(item.reward) - since_seen - steps * per_step;
            expected.max(0.0) / (1.0 + cfg.distance_weight * steps)
        }
        Goal::Deliver { .. } | Goal::DeliverToPeer { .. } => {
            let carried = f64::from(world.beliefs.carried_value());
            let count = world.beliefs.carried().len() as f64;
            carried - carried.min(steps * per_step * count)
        }
        Goal::Idle => cfg.idle_score,
    };

    if value.is_nan() {
        0.0
    } else {
        value
    }
}
