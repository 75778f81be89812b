use std::collections::{BTreeSet, VecDeque};

use courier_core::{AgentId, Cell, TileKind, TileMap};
use courier_nav::{candidate_cells, NavGraph};

fn edge_set(graph: &NavGraph) -> BTreeSet<(Cell, Cell)> {
    let map = graph.map();
    let mut out = BTreeSet::new();
    for y in 0..map.height() as i32 {
        for x in 0..map.width() as i32 {
            let c = Cell::new(x, y);
            for n in graph.neighbors(c) {
                out.insert((c, n));
            }
        }
    }
    out
}

/// Independent reference: plain BFS over the graph's current neighbour relation.
fn bfs_distance(graph: &NavGraph, from: Cell, to: Cell) -> Option<u32> {
    if !graph.contains(from) || !graph.contains(to) {
        return None;
    }
    let mut seen = BTreeSet::from([from]);
    let mut queue = VecDeque::from([(from, 0u32)]);
    while let Some((c, d)) = queue.pop_front() {
        if c == to {
            return Some(d);
        }
        for n in graph.neighbors(c) {
            if seen.insert(n) {
                queue.push_back((n, d + 1));
            }
        }
    }
    None
}

fn rooms() -> TileMap {
    TileMap::from_rows(&[
        "......#...",
        ".####.#.#.",
        ".#....#.#.",
        ".#.####.#.",
        ".#......#.",
        ".######.#.",
        "........#.",
    ])
}

#[test]
fn build_creates_nodes_only_for_traversable_tiles() {
    let graph = NavGraph::build(TileMap::from_rows(&[".#", ".."]));
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    assert!(!graph.contains(Cell::new(1, 1)));
    assert!(graph.has_edge(Cell::new(0, 0), Cell::new(1, 0)));
    assert!(graph.has_edge(Cell::new(1, 0), Cell::new(0, 0)));
    assert!(!graph.has_edge(Cell::new(0, 1), Cell::new(1, 1)));
}

#[test]
fn shortest_path_matches_bfs_distance_for_every_pair() {
    let graph = NavGraph::build(rooms());
    let map = graph.map().clone();
    let cells: Vec<Cell> = (0..map.len()).map(|i| map.cell_at(i)).collect();

    for &a in &cells {
        for &b in &cells {
            let expected = bfs_distance(&graph, a, b);
            let route = graph.shortest_path(a, b);
            assert_eq!(route.as_ref().map(|r| r.cost), expected, "{a} -> {b}");
            if let Some(route) = route {
                assert_eq!(route.start(), Some(a));
                assert_eq!(route.end(), Some(b));
                assert_eq!(route.cells.len() as u32, route.cost + 1);
                for (x, y) in route.steps() {
                    assert!(graph.has_edge(x, y), "route uses missing edge {x} -> {y}");
                }
            }
        }
    }
}

#[test]
fn no_path_for_disconnected_or_missing_endpoints() {
    let graph = NavGraph::build(TileMap::from_rows(&["..#.."]));
    assert!(graph.shortest_path(Cell::new(0, 0), Cell::new(4, 0)).is_none());
    assert!(graph.shortest_path(Cell::new(0, 0), Cell::new(2, 0)).is_none());
    assert!(graph.shortest_path(Cell::new(-3, 0), Cell::new(1, 0)).is_none());
    assert_eq!(
        graph.shortest_path(Cell::new(0, 0), Cell::new(0, 0)).map(|r| r.cost),
        Some(0)
    );
}

#[test]
fn block_then_unblock_restores_original_edges() {
    let mut graph = NavGraph::build(rooms());
    let before = edge_set(&graph);
    let peer = AgentId::new("peer");
    let cells = [Cell::new(3, 2), Cell::new(4, 2)];

    graph.block(&peer, &cells);
    for c in cells {
        assert!(!graph.contains(c));
        assert_eq!(graph.neighbors(c).count(), 0);
        for n in c.neighbors() {
            assert!(!graph.has_edge(n, c));
        }
    }

    graph.unblock(&peer, &cells);
    assert_eq!(edge_set(&graph), before);
}

#[test]
fn block_and_unblock_are_idempotent() {
    let mut graph = NavGraph::build(rooms());
    let before = edge_set(&graph);
    let peer = AgentId::new("peer");
    let cells = [Cell::new(0, 0), Cell::new(1, 0)];

    graph.block(&peer, &cells);
    let blocked = edge_set(&graph);
    graph.block(&peer, &cells);
    assert_eq!(edge_set(&graph), blocked);

    // Reverse order release.
    graph.unblock(&peer, &[Cell::new(1, 0)]);
    graph.unblock(&peer, &[Cell::new(0, 0)]);
    graph.unblock(&peer, &cells);
    assert_eq!(edge_set(&graph), before);
}

#[test]
fn unblock_never_restores_cells_held_by_a_third_agent() {
    let mut graph = NavGraph::build(TileMap::from_rows(&["....."]));
    let a = AgentId::new("a");
    let b = AgentId::new("b");

    graph.block(&a, &[Cell::new(1, 0), Cell::new(2, 0)]);
    graph.block(&b, &[Cell::new(2, 0), Cell::new(3, 0)]);
    graph.unblock(&a, &[Cell::new(1, 0), Cell::new(2, 0)]);

    assert!(graph.contains(Cell::new(1, 0)));
    assert!(!graph.contains(Cell::new(2, 0)));
    assert!(!graph.has_edge(Cell::new(1, 0), Cell::new(2, 0)));
    assert_eq!(graph.holders(Cell::new(2, 0)).collect::<Vec<_>>(), vec![&b]);

    graph.release_all(&b);
    assert_eq!(graph.edge_count(), 4);
}

#[test]
fn unblock_does_not_resurrect_walls() {
    let mut graph = NavGraph::build(TileMap::from_rows(&[".#."]));
    let a = AgentId::new("a");
    graph.unblock(&a, &[Cell::new(1, 0)]);
    assert!(!graph.contains(Cell::new(1, 0)));
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn peer_in_the_only_connecting_cell_cuts_the_route_until_it_leaves() {
    // Corridor whose middle cell (2, 1) is the only way from left to right.
    let mut graph = NavGraph::build(TileMap::from_rows(&["##.##", ".....", "##.##"]));
    let me = Cell::new(0, 1);
    let item = Cell::new(4, 1);
    let peer = AgentId::new("peer");
    assert!(graph.shortest_path(me, item).is_some());

    graph.block(&peer, &[Cell::new(2, 1)]);
    assert!(graph.shortest_path(me, item).is_none());

    // Peer steps into the alcove above the doorway.
    graph.unblock(&peer, &[Cell::new(2, 1)]);
    graph.block(&peer, &[Cell::new(2, 2)]);
    let route = graph.shortest_path(me, item).expect("path once the peer moved");
    assert_eq!(route.cost, 4);
}

#[test]
fn path_tree_reports_nearest_target() {
    let graph = NavGraph::build(TileMap::from_rows(&["D...D.."]));
    let tree = graph.distances_from(Cell::new(2, 0)).unwrap();
    assert_eq!(
        tree.nearest([Cell::new(0, 0), Cell::new(4, 0)]),
        Some((Cell::new(0, 0), 2))
    );
    assert_eq!(tree.route_to(Cell::new(6, 0)).map(|r| r.cost), Some(4));
}

#[test]
fn candidates_are_dense_and_mutually_distant() {
    let mut map = TileMap::new(20, 5);
    for y in 0..5 {
        for x in 0..20 {
            map.set(Cell::new(x, y), TileKind::Walkable);
        }
    }
    // Dense cluster on the left, a single spawner on the right.
    for (x, y) in [(1, 1), (1, 2), (2, 1), (2, 2), (2, 3)] {
        map.set(Cell::new(x, y), TileKind::Spawner);
    }
    map.set(Cell::new(18, 2), TileKind::Spawner);

    let picked = candidate_cells(&map, 2, 4);
    assert_eq!(picked.len(), 2);
    assert!(picked[0].x <= 2, "densest cluster comes first: {:?}", picked);
    assert_eq!(picked[1], Cell::new(18, 2));
    assert!(picked[0].manhattan(picked[1]) >= 4);
}
