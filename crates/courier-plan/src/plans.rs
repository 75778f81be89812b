//! The default strategy bodies.

use courier_core::{CancelToken, Cell, DeterministicRng, Direction, ItemId, TileKind, Timestamp};
use courier_intent::Goal;
use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::navigate::{current_cell, step};
use crate::{navigate, PlanContext, PlanError};

type PlanFuture<'a> = BoxFuture<'a, Result<(), PlanError>>;

fn check(cancel: &CancelToken) -> Result<(), PlanError> {
    if cancel.is_cancelled() {
        Err(PlanError::Stopped)
    } else {
        Ok(())
    }
}

async fn is_carrying(ctx: &PlanContext) -> bool {
    ctx.world.lock().await.beliefs.is_carrying()
}

/// Pick up on `target` and fold the result into beliefs.
async fn collect(
    ctx: &PlanContext,
    item: &ItemId,
    target: Cell,
    cancel: &CancelToken,
) -> Result<(), PlanError> {
    if current_cell(ctx).await? != target {
        return Err(PlanError::NotPositioned);
    }
    check(cancel)?;
    let picked = ctx.actuator.pick_up().await?;

    let mut world = ctx.world.lock().await;
    world.beliefs.confirm_pickup(&picked, Timestamp::now());
    if !picked.contains(item) {
        debug!(item = %item, "target was not on the cell");
        world.beliefs.forget_item(item);
    }
    info!(item = %item, picked = picked.len(), carried = world.beliefs.carried_value(), "picked up");
    check(cancel)
}

/// Put down on a delivery tile.
async fn drop_off(ctx: &PlanContext, cancel: &CancelToken) -> Result<(), PlanError> {
    let me = current_cell(ctx).await?;
    if ctx.world.lock().await.map().kind(me) != TileKind::Delivery {
        return Err(PlanError::NotPositioned);
    }
    check(cancel)?;
    let dropped = ctx.actuator.put_down().await?;

    let reward = ctx.world.lock().await.beliefs.confirm_putdown(&dropped);
    info!(cell = %me, items = dropped.len(), reward, "delivered");
    check(cancel)
}

pub(crate) fn pick_up<'a>(
    ctx: &'a PlanContext,
    goal: &'a Goal,
    cancel: &'a CancelToken,
) -> PlanFuture<'a> {
    Box::pin(async move {
        let Goal::PickUp { item, route } = goal else {
            return Err(PlanError::NoApplicablePlan);
        };
        let route = route.as_ref().ok_or(PlanError::PathUnavailable)?;
        let target = route.end().ok_or(PlanError::PathUnavailable)?;
        navigate(ctx, route, cancel).await?;
        collect(ctx, item, target, cancel).await
    })
}

pub(crate) fn pick_up_replanned<'a>(
    ctx: &'a PlanContext,
    goal: &'a Goal,
    cancel: &'a CancelToken,
) -> PlanFuture<'a> {
    Box::pin(async move {
        let Goal::PickUp { item, .. } = goal else {
            return Err(PlanError::NoApplicablePlan);
        };
        let (target, route) = {
            let world = ctx.world.lock().await;
            let me = world.my_cell().ok_or(PlanError::NotPositioned)?;
            let target = world
                .beliefs
                .item(item)
                .map(|i| i.cell)
                .ok_or(PlanError::PathUnavailable)?;
            let route = world
                .graph
                .shortest_path(me, target)
                .ok_or(PlanError::PathUnavailable)?;
            (target, route)
        };
        navigate(ctx, &route, cancel).await?;
        collect(ctx, item, target, cancel).await
    })
}

pub(crate) fn deliver<'a>(
    ctx: &'a PlanContext,
    goal: &'a Goal,
    cancel: &'a CancelToken,
) -> PlanFuture<'a> {
    Box::pin(async move {
        if !is_carrying(ctx).await {
            return Ok(());
        }
        let route = goal.route().ok_or(PlanError::PathUnavailable)?;
        navigate(ctx, route, cancel).await?;
        drop_off(ctx, cancel).await
    })
}

pub(crate) fn deliver_nearest<'a>(
    ctx: &'a PlanContext,
    _goal: &'a Goal,
    cancel: &'a CancelToken,
) -> PlanFuture<'a> {
    Box::pin(async move {
        if !is_carrying(ctx).await {
            return Ok(());
        }
        let route = {
            let world = ctx.world.lock().await;
            let me = world.my_cell().ok_or(PlanError::NotPositioned)?;
            let tree = world
                .graph
                .distances_from(me)
                .ok_or(PlanError::PathUnavailable)?;
            let (cell, _) = tree
                .nearest(world.map().delivery_cells())
                .ok_or(PlanError::PathUnavailable)?;
            tree.route_to(cell).ok_or(PlanError::PathUnavailable)?
        };
        navigate(ctx, &route, cancel).await?;
        drop_off(ctx, cancel).await
    })
}

pub(crate) fn deliver_to_peer<'a>(
    ctx: &'a PlanContext,
    goal: &'a Goal,
    cancel: &'a CancelToken,
) -> PlanFuture<'a> {
    Box::pin(async move {
        let Goal::DeliverToPeer { peer, route } = goal else {
            return Err(PlanError::NoApplicablePlan);
        };
        if !is_carrying(ctx).await {
            return Ok(());
        }
        let route = route.as_ref().ok_or(PlanError::PathUnavailable)?;
        navigate(ctx, route, cancel).await?;
        check(cancel)?;
        let dropped = ctx.actuator.put_down().await?;

        let exits: Vec<Direction> = {
            let mut world = ctx.world.lock().await;
            let me = world.my_cell().ok_or(PlanError::NotPositioned)?;
            world
                .beliefs
                .reassign_to_peer(&dropped, me, Timestamp::now());
            info!(peer = %peer, cell = %me, items = dropped.len(), "left items for peer");
            Direction::ALL
                .into_iter()
                .filter(|d| world.graph.contains(me.step(*d)))
                .collect()
        };
        check(cancel)?;

        // Clear the drop cell so the peer can reach it.
        for direction in exits {
            if matches!(step(ctx, direction, cancel).await, Ok(true)) {
                break;
            }
        }
        Ok(())
    })
}

pub(crate) fn idle<'a>(
    ctx: &'a PlanContext,
    _goal: &'a Goal,
    cancel: &'a CancelToken,
) -> PlanFuture<'a> {
    Box::pin(async move {
        let revisit = ctx.limits.candidate_revisit;
        let (route, wander, pause) = {
            let mut world = ctx.world.lock().await;
            let me = world.my_cell().ok_or(PlanError::NotPositioned)?;
            let now = Timestamp::now();

            let mut route = None;
            for cell in world.stale_candidates(now, revisit) {
                if cell == me {
                    world.mark_visited(me, now);
                    continue;
                }
                if let Some(found) = world.graph.shortest_path(me, cell) {
                    route = Some(found);
                    break;
                }
            }

            let legal: Vec<Direction> = Direction::ALL
                .into_iter()
                .filter(|d| world.graph.contains(me.step(*d)))
                .collect();
            let previous = world.beliefs.me().previous_cell;
            let forward: Vec<Direction> = legal
                .iter()
                .copied()
                .filter(|d| Some(me.step(*d)) != previous)
                .collect();
            let pool = if forward.is_empty() { legal } else { forward };
            let wander = if pool.is_empty() {
                None
            } else {
                let pick = world.rng.next_below(pool.len());
                Some(pool[pick])
            };
            (route, wander, world.config().movement_duration())
        };

        if let Some(route) = route {
            debug!(to = ?route.end(), "exploring candidate");
            return navigate(ctx, &route, cancel).await;
        }
        match wander {
            Some(direction) => {
                step(ctx, direction, cancel).await?;
            }
            None => {
                tokio::time::sleep(pause).await;
                check(cancel)?;
            }
        }
        Ok(())
    })
}
