use courier_belief::{AgentSighting, ItemSighting, SelfSighting, SenseEvent, World};
use courier_core::{AgentId, Cell, ItemId, SimConfig, TileMap, Timestamp};
use courier_intent::{
    generate_options, score, still_valid, Goal, GoalKey, IntentionScheduler, IntentionState,
    ScoreConfig, ScoreContext,
};
use courier_nav::Route;

const T0: Timestamp = Timestamp(5_000_000);

fn world(rows: &[&str], x: f64, y: f64) -> World {
    let mut world = World::new(SimConfig::default(), 1);
    world.apply(&SenseEvent::Map(TileMap::from_rows(rows)), T0);
    world.apply(
        &SenseEvent::You(SelfSighting {
            id: AgentId::new("me"),
            name: None,
            x,
            y,
            score: 0,
        }),
        T0,
    );
    world
}

fn see_items(world: &mut World, items: &[(&str, i32, i32, u32)]) {
    let sightings = items
        .iter()
        .map(|(id, x, y, reward)| ItemSighting {
            id: ItemId::new(*id),
            x: f64::from(*x),
            y: f64::from(*y),
            reward: *reward,
            carried_by: None,
        })
        .collect();
    world.apply(&SenseEvent::Items(sightings), T0);
}

fn pickup(world: &World, id: &str) -> Goal {
    let item = ItemId::new(id);
    let cell = world.beliefs.item(&item).unwrap().cell;
    let route = world.graph.shortest_path(world.my_cell().unwrap(), cell);
    Goal::PickUp { item, route }
}

fn assert_sorted(scheduler: &IntentionScheduler) {
    let scores: Vec<f64> = scheduler.iter().map(|i| i.score).collect();
    assert!(
        scores.windows(2).all(|w| w[0] >= w[1]),
        "queue out of order: {scores:?}"
    );
}

#[test]
fn queue_stays_sorted_and_never_duplicates_a_goal() {
    let mut world = world(&["D........"], 4.0, 0.0);
    see_items(&mut world, &[("a", 1, 0, 2), ("b", 8, 0, 9), ("c", 5, 0, 4)]);
    let cfg = ScoreConfig::default();
    let ctx = ScoreContext::new(&world, &cfg, T0);
    let mut scheduler = IntentionScheduler::default();

    for goal in [
        Goal::Idle,
        pickup(&world, "a"),
        pickup(&world, "b"),
        pickup(&world, "c"),
        Goal::Idle,
        pickup(&world, "b"),
    ] {
        scheduler.push(goal, &ctx);
        assert_sorted(&scheduler);
    }
    assert_eq!(scheduler.len(), 4);

    let again = scheduler.push(pickup(&world, "c"), &ctx);
    assert!(!again.inserted);
    assert_eq!(scheduler.len(), 4);
    assert_eq!(
        scheduler.head().map(|i| i.key()),
        Some(GoalKey::PickUp(ItemId::new("b")))
    );
}

#[test]
fn higher_reward_wins_at_equal_distance() {
    let mut world = world(&["........."], 4.0, 0.0);
    see_items(&mut world, &[("low", 2, 0, 3), ("high", 6, 0, 8)]);
    let goal = generate_options(&world, &ScoreConfig::default(), T0);
    assert_eq!(goal.item(), Some(&ItemId::new("high")));
    assert_eq!(goal.route().map(|r| r.cost), Some(2));
}

#[test]
fn corridor_goals_follow_pickup_then_delivery() {
    let mut world = world(&["D.."], 0.0, 0.0);
    see_items(&mut world, &[("p", 2, 0, 5)]);
    let cfg = ScoreConfig::default();

    let first = generate_options(&world, &cfg, T0);
    assert_eq!(first.item(), Some(&ItemId::new("p")));
    assert_eq!(
        first.route().map(|r| r.cells.clone()),
        Some(vec![Cell::new(0, 0), Cell::new(1, 0), Cell::new(2, 0)])
    );

    world.apply(
        &SenseEvent::You(SelfSighting {
            id: AgentId::new("me"),
            name: None,
            x: 2.0,
            y: 0.0,
            score: 0,
        }),
        T0,
    );
    world.beliefs.confirm_pickup(&[ItemId::new("p")], T0);

    let second = generate_options(&world, &cfg, T0);
    assert!(matches!(second, Goal::Deliver { .. }));
    assert_eq!(second.destination(), Some(Cell::new(0, 0)));
    assert_eq!(second.route().map(|r| r.cost), Some(2));
}

#[test]
fn nothing_to_do_means_idle() {
    let world = world(&["D.."], 0.0, 0.0);
    assert_eq!(generate_options(&world, &ScoreConfig::default(), T0), Goal::Idle);
    assert_eq!(
        generate_options(&World::default(), &ScoreConfig::default(), T0),
        Goal::Idle
    );
}

#[test]
fn unreachable_delivery_falls_back_to_a_peer_handoff() {
    let mut world = world(&["D#..."], 2.0, 0.0);
    see_items(&mut world, &[("p", 2, 0, 5)]);
    world.beliefs.confirm_pickup(&[ItemId::new("p")], T0);
    world.apply(
        &SenseEvent::Agents(vec![AgentSighting {
            id: AgentId::new("peer"),
            x: 4.0,
            y: 0.0,
            score: 0,
        }]),
        T0,
    );

    let goal = generate_options(&world, &ScoreConfig::default(), T0);
    match goal {
        Goal::DeliverToPeer { peer, route } => {
            assert_eq!(peer, AgentId::new("peer"));
            assert_eq!(route.and_then(|r| r.end()), Some(Cell::new(3, 0)));
        }
        other => panic!("expected a hand-off, got {other}"),
    }
}

#[test]
fn stale_routes_score_as_unroutable() {
    let mut world = world(&["....."], 0.0, 0.0);
    see_items(&mut world, &[("p", 3, 0, 9)]);
    let cfg = ScoreConfig::default();
    let ctx = ScoreContext::new(&world, &cfg, T0);

    let elsewhere = Goal::PickUp {
        item: ItemId::new("p"),
        route: Some(Route {
            cost: 2,
            cells: vec![Cell::new(1, 0), Cell::new(2, 0), Cell::new(3, 0)],
        }),
    };
    assert_eq!(score(&elsewhere, &ctx), cfg.unroutable_score);

    let missing = Goal::PickUp {
        item: ItemId::new("p"),
        route: None,
    };
    assert_eq!(score(&missing, &ctx), cfg.unroutable_score);
    assert!(score(&pickup(&world, "p"), &ctx) > cfg.idle_score);
}

#[test]
fn goals_lose_validity_with_their_preconditions() {
    let mut world = world(&["D...."], 0.0, 0.0);
    see_items(&mut world, &[("p", 2, 0, 5), ("q", 3, 0, 5)]);
    let p = pickup(&world, "p");
    let q = pickup(&world, "q");
    assert!(still_valid(&p, &world));
    assert!(!still_valid(&Goal::Deliver { route: None }, &world));
    assert!(still_valid(&Goal::Idle, &world));

    world.beliefs.mark_assigned_elsewhere(&ItemId::new("p"));
    assert!(!still_valid(&p, &world));
    world.beliefs.forget_item(&ItemId::new("q"));
    assert!(!still_valid(&q, &world));

    let handoff = Goal::DeliverToPeer {
        peer: AgentId::new("ghost"),
        route: None,
    };
    assert!(!still_valid(&handoff, &world));
}

#[test]
fn better_goal_preempts_the_running_head() {
    let mut world = world(&["D...."], 0.0, 0.0);
    see_items(&mut world, &[("p", 2, 0, 9)]);
    let cfg = ScoreConfig::default();
    let ctx = ScoreContext::new(&world, &cfg, T0);
    let mut scheduler = IntentionScheduler::default();

    let idle = scheduler.push(Goal::Idle, &ctx).id;
    let (active, _, token) = scheduler.activate_head().unwrap();
    assert_eq!(active, idle);

    let outcome = scheduler.push(pickup(&world, "p"), &ctx);
    assert_eq!(outcome.stopped, Some(idle));
    assert!(token.is_cancelled());
    assert_eq!(scheduler.get(idle).unwrap().state, IntentionState::Stopped);

    assert!(scheduler.requeue_stopped(idle));
    let requeued = scheduler.get(idle).unwrap();
    assert_eq!(requeued.state, IntentionState::Queued);
    assert!(!requeued.cancel.is_cancelled());

    let (next, goal, _) = scheduler.activate_head().unwrap();
    assert_eq!(next, outcome.id);
    assert_eq!(goal.item(), Some(&ItemId::new("p")));
    assert_eq!(
        scheduler.complete(next).map(|i| i.state),
        Some(IntentionState::Completed)
    );
    assert_eq!(scheduler.len(), 1);
}

#[test]
fn invalid_heads_are_dropped_before_running() {
    let mut world = world(&["D...."], 0.0, 0.0);
    see_items(&mut world, &[("p", 2, 0, 9)]);
    let cfg = ScoreConfig::default();
    let mut scheduler = IntentionScheduler::default();
    {
        let ctx = ScoreContext::new(&world, &cfg, T0);
        scheduler.push(Goal::Idle, &ctx);
        scheduler.push(pickup(&world, "p"), &ctx);
    }
    assert!(scheduler.top_pickup_for(&ItemId::new("p")).is_some());

    world.beliefs.forget_item(&ItemId::new("p"));
    let dropped = scheduler.drop_invalid_heads(&world);
    assert_eq!(dropped.len(), 1);
    assert!(dropped[0].cancel.is_cancelled());
    assert_eq!(scheduler.head().map(|i| i.key()), Some(GoalKey::Idle));
    assert!(scheduler.top_pickup_for(&ItemId::new("p")).is_none());
}

#[test]
fn dropping_a_goal_cancels_it() {
    let world = world(&["D...."], 0.0, 0.0);
    let cfg = ScoreConfig::default();
    let ctx = ScoreContext::new(&world, &cfg, T0);
    let mut scheduler = IntentionScheduler::default();
    scheduler.push(Goal::Idle, &ctx);
    let (_, _, token) = scheduler.activate_head().unwrap();

    let dropped = scheduler.drop_goal(&GoalKey::Idle).unwrap();
    assert!(token.is_cancelled());
    assert_eq!(dropped.state, IntentionState::Stopped);
    assert!(scheduler.is_empty());
    assert!(scheduler.drop_goal(&GoalKey::Idle).is_none());
}

#[test]
fn score_config_reads_partial_yaml() {
    let cfg: ScoreConfig = serde_yaml::from_str("distance_weight: 0.25\n").unwrap();
    assert_eq!(cfg.distance_weight, 0.25);
    assert_eq!(cfg.idle_score, ScoreConfig::default().idle_score);
    assert_eq!(cfg.deliver_threshold, 1);
}
