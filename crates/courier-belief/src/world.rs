use std::collections::BTreeMap;
use std::time::Duration;

use courier_core::{Cell, ItemId, Position, SimConfig, SplitMix64, TileMap, Timestamp};
use courier_nav::{candidate_cells, NavGraph};
use tracing::info;

use crate::{BeliefStore, SenseEvent};

/// Result of applying one perception event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// Items we stopped tracking because they vanished; candidates for delete notices.
    pub removed_items: Vec<ItemId>,
    /// Whether goals should be regenerated.
    pub replan: bool,
}

/// Everything the agent reads when deciding and acting.
///
/// Owned by the runtime behind a single mutex; plans and the scheduler borrow it briefly and
/// never across an actuator call.
#[derive(Debug, Clone)]
pub struct World {
    pub beliefs: BeliefStore,
    pub graph: NavGraph,
    pub candidates: Vec<Cell>,
    pub candidate_visits: BTreeMap<Cell, Timestamp>,
    pub rng: SplitMix64,
    candidate_limit: usize,
    map_loaded: bool,
}

impl Default for World {
    fn default() -> Self {
        Self::new(SimConfig::default(), 0)
    }
}

impl World {
    pub fn new(config: SimConfig, seed: u64) -> Self {
        Self {
            beliefs: BeliefStore::new(config),
            graph: NavGraph::default(),
            candidates: Vec::new(),
            candidate_visits: BTreeMap::new(),
            rng: SplitMix64::new(seed),
            candidate_limit: 8,
            map_loaded: false,
        }
    }

    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit;
        self
    }

    pub fn with_agent_expiry(mut self, expiry: Duration) -> Self {
        self.beliefs = self.beliefs.with_agent_expiry(expiry);
        self
    }

    pub fn config(&self) -> &SimConfig {
        self.beliefs.config()
    }

    pub fn map(&self) -> &TileMap {
        self.graph.map()
    }

    pub fn has_map(&self) -> bool {
        self.map_loaded
    }

    pub fn my_cell(&self) -> Option<Cell> {
        self.beliefs.my_cell()
    }

    /// Rebuild the graph for a new map and recompute exploration candidates.
    pub fn load_map(&mut self, map: TileMap) {
        info!(width = map.width(), height = map.height(), "map received");
        self.candidate_visits.clear();
        self.graph = NavGraph::build(map);
        self.beliefs.reapply_reservations(&mut self.graph);
        self.refresh_candidates();
        self.map_loaded = true;
    }

    /// Recompute exploration candidates for the current map and item radius.
    /// Visit times survive for cells that stay candidates.
    fn refresh_candidates(&mut self) {
        let radius = self.config().item_observation_radius.max(1);
        self.candidates = candidate_cells(self.graph.map(), radius, self.candidate_limit);
        let candidates = &self.candidates;
        self.candidate_visits.retain(|cell, _| candidates.contains(cell));
    }

    /// Apply a move confirmed by the actuator.
    pub fn move_self(&mut self, position: Position, now: Timestamp) -> bool {
        let changed = self.beliefs.set_position(position, now);
        if changed {
            self.mark_visited(position.nearest_cell(), now);
        }
        changed
    }

    pub fn mark_visited(&mut self, cell: Cell, now: Timestamp) {
        if self.candidates.contains(&cell) {
            self.candidate_visits.insert(cell, now);
        }
    }

    /// Candidates not visited within `revisit`, least recently visited first.
    pub fn stale_candidates(&self, now: Timestamp, revisit: Duration) -> Vec<Cell> {
        let mut out: Vec<(Timestamp, Cell)> = self
            .candidates
            .iter()
            .filter_map(|c| match self.candidate_visits.get(c) {
                Some(at) if now.elapsed_since(*at) < revisit => None,
                Some(at) => Some((*at, *c)),
                None => Some((Timestamp::ZERO, *c)),
            })
            .collect();
        out.sort_by_key(|(at, _)| *at);
        out.into_iter().map(|(_, c)| c).collect()
    }

    pub fn apply(&mut self, event: &SenseEvent, now: Timestamp) -> Applied {
        let mut applied = Applied::default();
        match event {
            SenseEvent::Config(config) => {
                info!(
                    decay = ?config.decay_interval,
                    item_radius = config.item_observation_radius,
                    agent_radius = config.agent_observation_radius,
                    "simulation config received"
                );
                self.beliefs.set_config(config.clone());
                if self.map_loaded {
                    self.refresh_candidates();
                }
                applied.replan = true;
            }
            SenseEvent::Map(map) => {
                self.load_map(map.clone());
                applied.replan = true;
            }
            SenseEvent::You(me) => {
                if self.beliefs.observe_self(me, now) {
                    if let Some(cell) = self.my_cell() {
                        self.mark_visited(cell, now);
                    }
                }
                applied.replan = true;
            }
            SenseEvent::Items(items) => {
                let update = self.beliefs.observe_items(items, now);
                applied.replan = update.changed;
                applied.removed_items = update.removed;
            }
            SenseEvent::Agents(agents) => {
                let update = self.beliefs.observe_agents(agents, now, &mut self.graph);
                applied.replan = update.changed;
            }
        }
        let decayed = self.beliefs.decay_tick(now);
        if !decayed.is_empty() {
            applied.replan = true;
            applied.removed_items.extend(decayed);
        }
        applied
    }
}
