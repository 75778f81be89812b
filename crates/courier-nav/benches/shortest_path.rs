use courier_core::{AgentId, Cell, TileKind, TileMap};
use courier_nav::NavGraph;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn maze(width: u32, height: u32) -> TileMap {
    let mut map = TileMap::new(width, height);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            // Vertical walls every 4 columns with alternating gaps.
            let wall = x % 4 == 2 && (if (x / 4) % 2 == 0 { y != 0 } else { y != height as i32 - 1 });
            let kind = if wall {
                TileKind::Blocked
            } else {
                TileKind::Walkable
            };
            map.set(Cell::new(x, y), kind);
        }
    }
    map
}

fn bench_shortest_path(c: &mut Criterion) {
    let mut graph = NavGraph::build(maze(64, 64));
    let start = Cell::new(0, 0);
    let goal = Cell::new(63, 63);

    let mut group = c.benchmark_group("courier-nav/grid");

    group.bench_function("shortest_path", |b| {
        b.iter(|| {
            let route = graph.shortest_path(start, goal).expect("route");
            black_box(route.cost);
        })
    });

    group.bench_function("distances_from", |b| {
        b.iter(|| {
            let tree = graph.distances_from(start).expect("tree");
            black_box(tree.cost_to(goal));
        })
    });

    let peer = AgentId::new("peer");
    group.bench_function("block_unblock_pair", |b| {
        let cells = [Cell::new(31, 10), Cell::new(31, 11)];
        b.iter(|| {
            graph.block(&peer, &cells);
            graph.unblock(&peer, &cells);
            black_box(graph.edge_count());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_shortest_path);
criterion_main!(benches);
