//! Option generation: from beliefs to one candidate goal.

use courier_belief::World;
use courier_core::{Cell, Timestamp};
use courier_nav::PathTree;
use tracing::trace;

use crate::{score, Goal, ScoreConfig, ScoreContext};

/// Pick the single goal worth proposing to the scheduler.
///
/// Delivery comes first when the carried value reaches the threshold, capacity is full, or there
/// is nothing worth picking up; an unreachable delivery point falls back to handing the load to a
/// known peer. Otherwise the best free item wins, and idling is the last resort.
pub fn generate_options(world: &World, config: &ScoreConfig, now: Timestamp) -> Goal {
    let Some(me) = world.my_cell() else {
        return Goal::Idle;
    };
    let Some(tree) = world.graph.distances_from(me) else {
        return Goal::Idle;
    };
    let ctx = ScoreContext::new(world, config, now);
    let beliefs = &world.beliefs;

    let at_capacity = beliefs.carried().len() >= world.config().max_carried;
    let pickup = if at_capacity {
        None
    } else {
        best_pickup(world, &tree, &ctx)
    };

    if beliefs.is_carrying()
        && (beliefs.carried_value() >= config.deliver_threshold || at_capacity || pickup.is_none())
    {
        if let Some(goal) = delivery(world, &tree).or_else(|| rendezvous(world, &tree)) {
            return goal;
        }
    }

    pickup.unwrap_or(Goal::Idle)
}

fn best_pickup(world: &World, tree: &PathTree, ctx: &ScoreContext<'_>) -> Option<Goal> {
    let mut best: Option<(f64, u32, Goal)> = None;
    for item in world.beliefs.free_items() {
        let Some(route) = tree.route_to(item.cell) else {
            continue;
        };
        let cost = route.cost;
        let goal = Goal::PickUp {
            item: item.id.clone(),
            route: Some(route),
        };
        let value = score(&goal, ctx);
        trace!(item = %item.id, cost, value, "pickup option");
        if value <= 0.0 {
            continue;
        }
        let better = match &best {
            None => true,
            Some((v, c, _)) => value > *v || (value == *v && cost < *c),
        };
        if better {
            best = Some((value, cost, goal));
        }
    }
    best.map(|(_, _, goal)| goal)
}

fn delivery(world: &World, tree: &PathTree) -> Option<Goal> {
    let (cell, _) = tree.nearest(world.map().delivery_cells())?;
    Some(Goal::Deliver {
        route: tree.route_to(cell),
    })
}

/// Hand-off next to the closest known peer.
fn rendezvous(world: &World, tree: &PathTree) -> Option<Goal> {
    let mut best: Option<(u32, Goal)> = None;
    for agent in world.beliefs.agents().values() {
        if !agent.visibility.reserves_cells() {
            continue;
        }
        let spots: Vec<Cell> = agent
            .last_cell()
            .neighbors()
            .into_iter()
            .filter(|c| !agent.cells.contains(c))
            .collect();
        let Some((cell, cost)) = tree.nearest(spots) else {
            continue;
        };
        if best.as_ref().is_some_and(|(c, _)| *c <= cost) {
            continue;
        }
        best = Some((
            cost,
            Goal::DeliverToPeer {
                peer: agent.id.clone(),
                route: tree.route_to(cell),
            },
        ));
    }
    best.map(|(_, goal)| goal)
}
