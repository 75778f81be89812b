use core::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use courier_core::{AgentId, Cell, Direction, TileMap};

use crate::Route;

#[derive(Debug)]
struct OpenNode {
    cost: u32,
    idx: usize,
    tie: u64,
}

impl OpenNode {
    fn key(&self) -> (u32, u64, usize) {
        (self.cost, self.tie, self.idx)
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap behave like a min-heap.
        other.key().cmp(&self.key())
    }
}

fn dir_bit(dir: Direction) -> u8 {
    match dir {
        Direction::Up => 1,
        Direction::Right => 2,
        Direction::Down => 4,
        Direction::Left => 8,
    }
}

/// Mutable grid graph.
///
/// Node set invariant: a cell is a node iff its tile is traversable and no owner holds a
/// reservation on it. Edges are stored explicitly as a per-node direction mask and are kept
/// symmetric.
#[derive(Debug, Clone)]
pub struct NavGraph {
    map: TileMap,
    present: Vec<bool>,
    edges: Vec<u8>,
    holders: BTreeMap<Cell, BTreeSet<AgentId>>,
}

impl Default for NavGraph {
    fn default() -> Self {
        Self::build(TileMap::new(0, 0))
    }
}

impl NavGraph {
    /// Fresh graph for `map`; every previous node, edge and reservation is discarded.
    pub fn build(map: TileMap) -> Self {
        let len = map.len();
        let mut graph = Self {
            map,
            present: vec![false; len],
            edges: vec![0; len],
            holders: BTreeMap::new(),
        };
        for idx in 0..len {
            let cell = graph.map.cell_at(idx);
            if graph.map.is_traversable(cell) {
                graph.insert_node(cell);
            }
        }
        graph
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.map
            .index(cell)
            .map(|idx| self.present[idx])
            .unwrap_or(false)
    }

    pub fn has_edge(&self, a: Cell, b: Cell) -> bool {
        let (Some(idx), Some(dir)) = (self.map.index(a), a.direction_to(b)) else {
            return false;
        };
        self.edges[idx] & dir_bit(dir) != 0
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        let directed: u32 = self.edges.iter().map(|m| m.count_ones()).sum();
        (directed / 2) as usize
    }

    pub fn node_count(&self) -> usize {
        self.present.iter().filter(|p| **p).count()
    }

    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        let mask = self.map.index(cell).map(|idx| self.edges[idx]).unwrap_or(0);
        Direction::ALL
            .into_iter()
            .filter(move |d| mask & dir_bit(*d) != 0)
            .map(move |d| cell.step(d))
    }

    /// Owners currently reserving `cell`.
    pub fn holders(&self, cell: Cell) -> impl Iterator<Item = &AgentId> {
        self.holders.get(&cell).into_iter().flatten()
    }

    /// Reserve `cells` for `owner`, removing them and every edge touching them.
    pub fn block(&mut self, owner: &AgentId, cells: &[Cell]) {
        for &cell in cells {
            if !self.map.in_bounds(cell) {
                continue;
            }
            self.holders.entry(cell).or_default().insert(owner.clone());
            self.remove_node(cell);
        }
    }

    /// Drop `owner`'s reservation on `cells`; a cell comes back only once nobody holds it.
    pub fn unblock(&mut self, owner: &AgentId, cells: &[Cell]) {
        for &cell in cells {
            if let Some(set) = self.holders.get_mut(&cell) {
                set.remove(owner);
                if set.is_empty() {
                    self.holders.remove(&cell);
                }
            }
            if !self.holders.contains_key(&cell) && self.map.is_traversable(cell) {
                self.insert_node(cell);
            }
        }
    }

    /// Drop every reservation held by `owner`.
    pub fn release_all(&mut self, owner: &AgentId) {
        let cells: Vec<Cell> = self
            .holders
            .iter()
            .filter(|(_, set)| set.contains(owner))
            .map(|(cell, _)| *cell)
            .collect();
        self.unblock(owner, &cells);
    }

    fn insert_node(&mut self, cell: Cell) {
        let Some(idx) = self.map.index(cell) else {
            return;
        };
        if self.present[idx] {
            return;
        }
        self.present[idx] = true;
        for dir in Direction::ALL {
            let n = cell.step(dir);
            let Some(n_idx) = self.map.index(n) else { continue };
            if self.present[n_idx] {
                self.edges[idx] |= dir_bit(dir);
                self.edges[n_idx] |= dir_bit(dir.opposite());
            }
        }
    }

    fn remove_node(&mut self, cell: Cell) {
        let Some(idx) = self.map.index(cell) else {
            return;
        };
        if !self.present[idx] {
            return;
        }
        self.present[idx] = false;
        self.edges[idx] = 0;
        for dir in Direction::ALL {
            if let Some(n_idx) = self.map.index(cell.step(dir)) {
                self.edges[n_idx] &= !dir_bit(dir.opposite());
            }
        }
    }

    /// Uniform-cost shortest path; `None` when unreachable or an endpoint is not a node.
    pub fn shortest_path(&self, from: Cell, to: Cell) -> Option<Route> {
        let to_idx = self.map.index(to)?;
        if !self.present[to_idx] {
            return None;
        }
        let tree = self.search(from, Some(to_idx))?;
        tree.route_to(to)
    }

    /// Single-source shortest-path tree covering every reachable node.
    pub fn distances_from(&self, from: Cell) -> Option<PathTree> {
        self.search(from, None)
    }

    fn search(&self, from: Cell, stop_at: Option<usize>) -> Option<PathTree> {
        let start_idx = self.map.index(from)?;
        if !self.present[start_idx] {
            return None;
        }

        let len = self.map.len();
        let mut dist = vec![u32::MAX; len];
        let mut prev: Vec<Option<usize>> = vec![None; len];
        let mut open = BinaryHeap::<OpenNode>::new();
        let mut tie: u64 = 0;

        dist[start_idx] = 0;
        open.push(OpenNode {
            cost: 0,
            idx: start_idx,
            tie,
        });

        while let Some(node) = open.pop() {
            if node.cost != dist[node.idx] {
                // Stale heap entry.
                continue;
            }
            if Some(node.idx) == stop_at {
                break;
            }

            let cell = self.map.cell_at(node.idx);
            for n in self.neighbors(cell) {
                let Some(n_idx) = self.map.index(n) else { continue };
                let candidate = node.cost.saturating_add(1);
                if candidate >= dist[n_idx] {
                    continue;
                }
                dist[n_idx] = candidate;
                prev[n_idx] = Some(node.idx);
                tie += 1;
                open.push(OpenNode {
                    cost: candidate,
                    idx: n_idx,
                    tie,
                });
            }
        }

        Some(PathTree {
            map: self.map.clone(),
            origin: from,
            dist,
            prev,
        })
    }
}

/// Result of a single-source search.
#[derive(Debug, Clone)]
pub struct PathTree {
    map: TileMap,
    origin: Cell,
    dist: Vec<u32>,
    prev: Vec<Option<usize>>,
}

impl PathTree {
    pub fn origin(&self) -> Cell {
        self.origin
    }

    pub fn cost_to(&self, cell: Cell) -> Option<u32> {
        let idx = self.map.index(cell)?;
        match self.dist[idx] {
            u32::MAX => None,
            d => Some(d),
        }
    }

    pub fn route_to(&self, cell: Cell) -> Option<Route> {
        let cost = self.cost_to(cell)?;
        let mut current = self.map.index(cell)?;
        let mut cells = vec![cell];
        while let Some(p) = self.prev[current] {
            current = p;
            cells.push(self.map.cell_at(current));
        }
        cells.reverse();
        Some(Route { cost, cells })
    }

    /// Reachable cell among `targets` with the lowest cost (first wins on ties).
    pub fn nearest<I>(&self, targets: I) -> Option<(Cell, u32)>
    where
        I: IntoIterator<Item = Cell>,
    {
        targets
            .into_iter()
            .filter_map(|c| self.cost_to(c).map(|d| (c, d)))
            .min_by_key(|(_, d)| *d)
    }
}
