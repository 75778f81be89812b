use std::time::Duration;

use courier_belief::{
    AgentSighting, BeliefStore, Item, ItemSighting, SelfSighting, SenseEvent, Visibility, World,
};
use courier_core::{
    AgentId, Cell, DecayInterval, ItemId, Position, SimConfig, TileMap, Timestamp,
};
use courier_nav::NavGraph;

const T0: Timestamp = Timestamp(1_000_000);

fn at(ms: u64) -> Timestamp {
    Timestamp(T0.0 + ms)
}

fn config() -> SimConfig {
    SimConfig {
        item_observation_radius: 3,
        agent_observation_radius: 3,
        decay_interval: DecayInterval::Every(Duration::from_secs(1)),
        reward_floor: 0,
        ..SimConfig::default()
    }
}

fn me(x: f64, y: f64) -> SelfSighting {
    SelfSighting {
        id: AgentId::new("me"),
        name: None,
        x,
        y,
        score: 0,
    }
}

fn item(id: &str, x: f64, y: f64, reward: u32, carrier: Option<&str>) -> ItemSighting {
    ItemSighting {
        id: ItemId::new(id),
        x,
        y,
        reward,
        carried_by: carrier.map(AgentId::new),
    }
}

fn agent(id: &str, x: f64, y: f64) -> AgentSighting {
    AgentSighting {
        id: AgentId::new(id),
        x,
        y,
        score: 0,
    }
}

fn store_at(x: f64, y: f64) -> BeliefStore {
    let mut store = BeliefStore::new(config());
    store.observe_self(&me(x, y), T0);
    store
}

#[test]
fn items_are_classified_by_carrier() {
    let mut store = store_at(0.0, 0.0);
    let update = store.observe_items(
        &[
            item("free", 1.0, 0.0, 10, None),
            item("mine", 0.0, 0.0, 7, Some("me")),
            item("theirs", 2.0, 0.0, 4, Some("other")),
        ],
        T0,
    );
    assert!(update.changed);
    assert!(store.item(&ItemId::new("free")).is_some());
    assert!(store.item(&ItemId::new("mine")).is_none());
    assert!(store.item(&ItemId::new("theirs")).is_none());
    assert_eq!(store.carried_value(), 7);
}

#[test]
fn absence_counts_only_inside_observation_range() {
    let mut store = store_at(0.0, 0.0);
    store.observe_items(
        &[item("near", 2.0, 0.0, 5, None), item("far", 9.0, 0.0, 5, None)],
        T0,
    );

    // "far" was reported by a wider sensor earlier; now neither is in the list.
    let update = store.observe_items(&[], at(10));
    assert_eq!(update.removed, vec![ItemId::new("near")]);
    assert!(store.item(&ItemId::new("far")).is_some());
}

#[test]
fn item_picked_by_someone_else_is_reported_removed() {
    let mut store = store_at(0.0, 0.0);
    store.observe_items(&[item("a", 1.0, 0.0, 5, None)], T0);
    let update = store.observe_items(&[item("a", 1.0, 0.0, 5, Some("rival"))], at(10));
    assert_eq!(update.removed, vec![ItemId::new("a")]);
}

#[test]
fn malformed_sightings_are_ignored() {
    let mut store = store_at(0.0, 0.0);
    let update = store.observe_items(
        &[item("nan", f64::NAN, 0.0, 5, None), item("moving", 1.5, 0.0, 5, None)],
        T0,
    );
    assert!(!update.changed);
    assert!(store.items().is_empty());
    assert!(!store.observe_self(&me(f64::INFINITY, 0.0), at(1)));
    assert_eq!(store.my_cell(), Some(Cell::new(0, 0)));
}

#[test]
fn decay_is_monotone_floored_and_removes_exactly_at_floor() {
    let mut cfg = config();
    cfg.reward_floor = 2;
    let mut store = BeliefStore::new(cfg);
    store.observe_self(&me(50.0, 50.0), T0);
    store.observe_items(&[item("x", 0.0, 0.0, 6, None)], T0);

    let id = ItemId::new("x");
    let mut last = 6;
    for (ms, expect_present) in [
        (500, true),
        (999, true),
        (1_000, true),
        (2_500, true),
        (3_999, true),
        (4_000, false),
    ] {
        store.decay_tick(at(ms));
        match store.item(&id) {
            Some(i) => {
                assert!(expect_present, "item should be gone at {ms}ms");
                assert!(i.reward <= last);
                assert!(i.reward > 2);
                last = i.reward;
            }
            None => assert!(!expect_present, "item vanished early at {ms}ms"),
        }
    }
}

#[test]
fn decay_uses_floor_division_and_is_idempotent() {
    let mut store = store_at(50.0, 50.0);
    store.observe_items(&[item("x", 0.0, 0.0, 10, None)], T0);
    let id = ItemId::new("x");

    store.decay_tick(at(2_700));
    assert_eq!(store.item(&id).unwrap().reward, 8);
    store.decay_tick(at(2_700));
    store.decay_tick(at(2_700));
    assert_eq!(store.item(&id).unwrap().reward, 8);

    // The 700ms remainder is carried over, not lost.
    store.decay_tick(at(3_000));
    assert_eq!(store.item(&id).unwrap().reward, 7);
}

#[test]
fn infinite_decay_never_changes_rewards() {
    let mut cfg = config();
    cfg.decay_interval = DecayInterval::Never;
    let mut store = BeliefStore::new(cfg);
    store.observe_self(&me(50.0, 50.0), T0);
    store.observe_items(&[item("x", 0.0, 0.0, 3, None)], T0);
    store.decay_tick(at(1_000_000));
    assert_eq!(store.item(&ItemId::new("x")).unwrap().reward, 3);
}

#[test]
fn agent_cells_follow_visibility() {
    let mut graph = NavGraph::build(TileMap::from_rows(&["........"]));
    let mut store = store_at(0.0, 0.0);
    let peer = AgentId::new("peer");

    // In transit between (1,0) and (2,0): both reserved.
    store.observe_agents(&[agent("peer", 1.4, 0.0)], T0, &mut graph);
    assert!(!graph.contains(Cell::new(1, 0)));
    assert!(!graph.contains(Cell::new(2, 0)));
    assert_eq!(store.agent(&peer).unwrap().cells.len(), 2);

    store.observe_agents(&[agent("peer", 2.0, 0.0)], at(100), &mut graph);
    let belief = store.agent(&peer).unwrap();
    assert_eq!(belief.cells, vec![Cell::new(2, 0)]);
    assert_eq!(belief.direction, Some(courier_core::Direction::Right));
    assert!(graph.contains(Cell::new(1, 0)));
    assert!(!graph.contains(Cell::new(2, 0)));

    // Missing while its cell is in range: confirmed absent, released.
    store.observe_agents(&[], at(200), &mut graph);
    assert_eq!(store.agent(&peer).unwrap().visibility, Visibility::Unknown);
    assert!(graph.contains(Cell::new(2, 0)));
}

#[test]
fn out_of_range_agents_keep_their_reservation_until_expiry() {
    let mut graph = NavGraph::build(TileMap::from_rows(&["........"]));
    let mut store = store_at(0.0, 0.0).with_agent_expiry(Duration::from_secs(5));
    let peer = AgentId::new("peer");

    store.observe_agents(&[agent("peer", 6.0, 0.0)], T0, &mut graph);
    store.observe_agents(&[], at(100), &mut graph);
    assert_eq!(store.agent(&peer).unwrap().visibility, Visibility::OutOfRange);
    assert!(!graph.contains(Cell::new(6, 0)));

    store.observe_agents(&[], at(4_000), &mut graph);
    assert!(!graph.contains(Cell::new(6, 0)));

    let update = store.observe_agents(&[], at(6_000), &mut graph);
    assert_eq!(update.released, vec![peer.clone()]);
    assert_eq!(store.agent(&peer).unwrap().visibility, Visibility::Unknown);
    assert!(graph.contains(Cell::new(6, 0)));
}

#[test]
fn out_of_range_agent_is_released_when_its_cell_comes_back_into_view_empty() {
    let mut graph = NavGraph::build(TileMap::from_rows(&["........"]));
    let mut store = store_at(0.0, 0.0).with_agent_expiry(Duration::from_secs(10));
    let peer = AgentId::new("peer");

    store.observe_agents(&[agent("peer", 6.0, 0.0)], T0, &mut graph);
    store.observe_agents(&[], at(100), &mut graph);
    assert_eq!(store.agent(&peer).unwrap().visibility, Visibility::OutOfRange);

    store.observe_self(&me(5.0, 0.0), at(200));
    let update = store.observe_agents(&[], at(300), &mut graph);
    assert_eq!(update.released, vec![peer.clone()]);
    assert_eq!(store.agent(&peer).unwrap().visibility, Visibility::Unknown);
    assert!(graph.contains(Cell::new(6, 0)));
}

#[test]
fn unknown_agent_sighted_again_reserves_its_new_cell() {
    let mut graph = NavGraph::build(TileMap::from_rows(&["........"]));
    let mut store = store_at(0.0, 0.0);
    let peer = AgentId::new("peer");

    store.observe_agents(&[agent("peer", 2.0, 0.0)], T0, &mut graph);
    store.observe_agents(&[], at(100), &mut graph);
    assert_eq!(store.agent(&peer).unwrap().visibility, Visibility::Unknown);
    assert!(graph.contains(Cell::new(2, 0)));

    let update = store.observe_agents(&[agent("peer", 1.0, 0.0)], at(200), &mut graph);
    assert!(update.changed);
    assert_eq!(store.agent(&peer).unwrap().visibility, Visibility::Visible);
    assert!(!graph.contains(Cell::new(1, 0)));
    assert!(graph.contains(Cell::new(2, 0)));
}

#[test]
fn self_sightings_are_not_treated_as_agents() {
    let mut graph = NavGraph::build(TileMap::from_rows(&["...."]));
    let mut store = store_at(0.0, 0.0);
    store.observe_agents(&[agent("me", 0.0, 0.0)], T0, &mut graph);
    assert!(store.agents().is_empty());
    assert!(graph.contains(Cell::new(0, 0)));
}

#[test]
fn remote_records_are_adopted_only_when_strictly_newer() {
    let mut graph = NavGraph::build(TileMap::from_rows(&["........"]));
    let mut store = store_at(0.0, 0.0);
    store.observe_items(&[item("a", 1.0, 0.0, 5, None)], at(100));

    let mut remote = Item::new(ItemId::new("a"), Cell::new(1, 0), 9, at(100));
    assert!(!store.adopt_remote_item(&remote));
    remote.observed_at = at(200);
    assert!(store.adopt_remote_item(&remote));
    assert_eq!(store.item(&ItemId::new("a")).unwrap().reward, 9);

    let peer = courier_belief::AgentBelief {
        id: AgentId::new("peer"),
        position: Position::new(5.0, 0.0),
        updated_at: at(300),
        direction: None,
        cells: vec![Cell::new(5, 0)],
        visibility: Visibility::Visible,
        score: 0,
    };
    assert!(store.adopt_remote_agent(&peer, &mut graph));
    assert!(!graph.contains(Cell::new(5, 0)));

    let mut moved = peer.clone();
    moved.position = Position::new(6.0, 0.0);
    moved.cells = vec![Cell::new(6, 0)];
    assert!(!store.adopt_remote_agent(&moved, &mut graph));
    moved.updated_at = at(400);
    assert!(store.adopt_remote_agent(&moved, &mut graph));
    assert!(graph.contains(Cell::new(5, 0)));
    assert!(!graph.contains(Cell::new(6, 0)));
}

#[test]
fn assigned_mark_survives_sightings_and_clears_when_forgotten() {
    let mut store = store_at(0.0, 0.0);
    let id = ItemId::new("a");
    store.observe_items(&[item("a", 1.0, 0.0, 5, None)], T0);
    store.mark_assigned_elsewhere(&id);

    store.observe_items(&[item("a", 1.0, 0.0, 5, None)], at(10));
    assert!(store.is_assigned_elsewhere(&id));
    assert_eq!(store.free_items().count(), 0);

    assert!(store.forget_item(&id));
    assert!(!store.is_assigned_elsewhere(&id));
    store.observe_items(&[item("a", 1.0, 0.0, 5, None)], at(20));
    assert_eq!(store.free_items().count(), 1);
}

#[test]
fn pickup_putdown_and_reassignment_move_items_atomically() {
    let mut store = store_at(0.0, 0.0);
    let a = ItemId::new("a");
    let b = ItemId::new("b");
    store.observe_items(
        &[item("a", 0.0, 0.0, 5, None), item("b", 0.0, 0.0, 3, None)],
        T0,
    );

    assert_eq!(store.confirm_pickup(&[a.clone(), b.clone()], at(10)), 2);
    assert!(store.items().is_empty());
    assert_eq!(store.carried_value(), 8);

    assert_eq!(store.confirm_putdown(&[a.clone()]), 5);
    assert_eq!(store.carried_value(), 3);

    store.reassign_to_peer(&[b.clone()], Cell::new(1, 0), at(20));
    assert_eq!(store.carried_value(), 0);
    assert_eq!(store.item(&b).unwrap().cell, Cell::new(1, 0));
    assert!(store.is_assigned_elsewhere(&b));
}

#[test]
fn world_rebuild_keeps_agent_reservations() {
    let mut world = World::new(config(), 7);
    world.apply(&SenseEvent::You(me(0.0, 0.0)), T0);
    world.apply(&SenseEvent::Map(TileMap::from_rows(&["....."])), T0);
    world.apply(&SenseEvent::Agents(vec![agent("peer", 2.0, 0.0)]), T0);
    assert!(!world.graph.contains(Cell::new(2, 0)));

    world.apply(&SenseEvent::Map(TileMap::from_rows(&["....."])), at(10));
    assert!(!world.graph.contains(Cell::new(2, 0)));
}

#[test]
fn world_reports_vanished_items_for_delete_notices() {
    let mut world = World::new(config(), 7);
    world.apply(&SenseEvent::Map(TileMap::from_rows(&["....."])), T0);
    world.apply(&SenseEvent::You(me(0.0, 0.0)), T0);
    world.apply(&SenseEvent::Items(vec![item("a", 1.0, 0.0, 5, None)]), T0);
    let applied = world.apply(&SenseEvent::Items(vec![]), at(10));
    assert!(applied.replan);
    assert_eq!(applied.removed_items, vec![ItemId::new("a")]);
}

#[test]
fn world_reports_decayed_items_for_delete_notices() {
    let mut world = World::new(config(), 7);
    world.apply(&SenseEvent::Map(TileMap::from_rows(&["....."])), T0);
    world.apply(&SenseEvent::You(me(0.0, 0.0)), T0);
    world.apply(&SenseEvent::Items(vec![item("a", 1.0, 0.0, 1, None)]), T0);

    let applied = world.apply(&SenseEvent::You(me(0.0, 0.0)), at(1_000));
    assert!(applied.replan);
    assert_eq!(applied.removed_items, vec![ItemId::new("a")]);
    assert!(world.beliefs.item(&ItemId::new("a")).is_none());
}

#[test]
fn late_config_recomputes_candidates_for_the_new_radius() {
    let mut world = World::new(config(), 1);
    world.apply(&SenseEvent::Map(TileMap::from_rows(&["S.........S"])), T0);
    assert_eq!(world.candidates.len(), 2);

    let wider = SimConfig {
        item_observation_radius: 6,
        ..config()
    };
    world.apply(&SenseEvent::Config(wider), at(10));
    assert_eq!(world.candidates, vec![Cell::new(0, 0)]);
}

#[test]
fn stale_candidates_prefer_least_recently_visited() {
    let map = TileMap::from_rows(&["S.........S"]);
    let mut world = World::new(config(), 1);
    world.load_map(map);
    assert_eq!(world.candidates.len(), 2);
    let first = world.candidates[0];
    let second = world.candidates[1];

    world.mark_visited(first, at(0));
    let revisit = Duration::from_secs(5);
    assert_eq!(world.stale_candidates(at(1_000), revisit), vec![second]);

    world.mark_visited(second, at(2_000));
    assert_eq!(world.stale_candidates(at(6_500), revisit), vec![first]);
    assert_eq!(world.stale_candidates(at(8_000), revisit), vec![first, second]);
}

#[test]
fn item_sightings_accept_server_field_names() {
    let raw = serde_json::json!([
        {"id": "p1", "x": 3, "y": 4, "reward": 12, "carriedBy": null},
        {"id": "p2", "x": 1, "y": 1, "reward": 5, "carriedBy": "a7"}
    ]);
    let sightings: Vec<ItemSighting> = serde_json::from_value(raw).unwrap();
    assert_eq!(sightings[0].carried_by, None);
    assert_eq!(sightings[1].carried_by, Some(AgentId::new("a7")));
    assert_eq!(sightings[0].position().nearest_cell(), Cell::new(3, 4));
}
