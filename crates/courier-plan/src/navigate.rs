use courier_core::{CancelToken, Cell, Direction, Timestamp};
use courier_nav::Route;
use tracing::{debug, trace};

use crate::{PlanContext, PlanError};

fn check(cancel: &CancelToken) -> Result<(), PlanError> {
    if cancel.is_cancelled() {
        Err(PlanError::Stopped)
    } else {
        Ok(())
    }
}

/// One actuator step, recorded in the world on success. Returns whether we moved.
pub(crate) async fn step(
    ctx: &PlanContext,
    direction: Direction,
    cancel: &CancelToken,
) -> Result<bool, PlanError> {
    check(cancel)?;
    let moved = ctx.actuator.step(direction).await?;
    if let Some(position) = moved {
        trace!(direction = direction.name(), x = position.x, y = position.y, "moved");
        ctx.world.lock().await.move_self(position, Timestamp::now());
    }
    check(cancel)?;
    Ok(moved.is_some())
}

/// Try all four directions once; true as soon as one moves.
async fn probe(ctx: &PlanContext, cancel: &CancelToken) -> Result<bool, PlanError> {
    for direction in Direction::ALL {
        if step(ctx, direction, cancel).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Walk `route` from the current cell to its end.
///
/// Each next cell must still be in the graph. When a step is refused, a probe round tries all four
/// directions; if one moves, the route is recomputed from the new cell, at most
/// `max_probe_rounds` times.
pub async fn navigate(
    ctx: &PlanContext,
    route: &Route,
    cancel: &CancelToken,
) -> Result<(), PlanError> {
    let destination = route.end().ok_or(PlanError::PathUnavailable)?;
    let mut route = route.clone();
    let mut rounds = 0;

    loop {
        check(cancel)?;
        let me = current_cell(ctx).await?;
        if route.start() != Some(me) {
            return Err(PlanError::PathUnavailable);
        }

        let mut rerouted = None;
        for (from, to) in route.steps() {
            check(cancel)?;
            if !ctx.world.lock().await.graph.contains(to) {
                debug!(cell = %to, "next cell occupied");
                return Err(PlanError::Blocked(to));
            }
            let direction = from.direction_to(to).ok_or(PlanError::PathUnavailable)?;
            if step(ctx, direction, cancel).await? {
                continue;
            }

            debug!(from = %from, direction = direction.name(), "step refused, probing");
            if rounds >= ctx.limits.max_probe_rounds || !probe(ctx, cancel).await? {
                return Err(PlanError::Stuck);
            }
            rounds += 1;
            let me = current_cell(ctx).await?;
            let fresh = ctx.world.lock().await.graph.shortest_path(me, destination);
            rerouted = Some(fresh.ok_or(PlanError::PathUnavailable)?);
            break;
        }

        match rerouted {
            Some(fresh) => route = fresh,
            None => return Ok(()),
        }
    }
}

pub(crate) async fn current_cell(ctx: &PlanContext) -> Result<Cell, PlanError> {
    ctx.world
        .lock()
        .await
        .my_cell()
        .ok_or(PlanError::NotPositioned)
}
