use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use courier_core::{AgentId, Cell, ItemId, Position, SimConfig, Timestamp};
use courier_nav::NavGraph;
use tracing::{debug, trace};

use crate::agent::heading;
use crate::{AgentBelief, AgentSighting, CarriedItem, Item, ItemSighting, SelfSighting, Visibility};

/// What this agent knows about itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelfState {
    pub id: Option<AgentId>,
    pub name: Option<String>,
    pub position: Option<Position>,
    /// Settled cell occupied before the current one; used to avoid walking straight back.
    pub previous_cell: Option<Cell>,
    pub score: i64,
    pub updated_at: Timestamp,
}

impl SelfState {
    pub fn cell(&self) -> Option<Cell> {
        self.position.map(Position::nearest_cell)
    }
}

/// Outcome of an item observation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    /// Tracked items that turned out to be gone; the peer should hear about these.
    pub removed: Vec<ItemId>,
    pub changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentUpdate {
    pub changed: bool,
    /// Agents whose reservation was released.
    pub released: Vec<AgentId>,
}

/// Exclusive owner of item, carried-item and agent beliefs.
///
/// Every operation tolerates malformed input by ignoring it; nothing here fails.
#[derive(Debug, Clone)]
pub struct BeliefStore {
    config: SimConfig,
    agent_expiry: Duration,
    me: SelfState,
    items: BTreeMap<ItemId, Item>,
    carried: BTreeMap<ItemId, CarriedItem>,
    agents: BTreeMap<AgentId, AgentBelief>,
    assigned_elsewhere: BTreeSet<ItemId>,
}

impl Default for BeliefStore {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl BeliefStore {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            agent_expiry: Duration::from_secs(10),
            me: SelfState::default(),
            items: BTreeMap::new(),
            carried: BTreeMap::new(),
            agents: BTreeMap::new(),
            assigned_elsewhere: BTreeSet::new(),
        }
    }

    pub fn with_agent_expiry(mut self, expiry: Duration) -> Self {
        self.agent_expiry = expiry;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SimConfig) {
        self.config = config;
    }

    pub fn me(&self) -> &SelfState {
        &self.me
    }

    pub fn my_id(&self) -> Option<&AgentId> {
        self.me.id.as_ref()
    }

    pub fn my_cell(&self) -> Option<Cell> {
        self.me.cell()
    }

    pub fn items(&self) -> &BTreeMap<ItemId, Item> {
        &self.items
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn carried(&self) -> &BTreeMap<ItemId, CarriedItem> {
        &self.carried
    }

    pub fn is_carrying(&self) -> bool {
        !self.carried.is_empty()
    }

    pub fn agents(&self) -> &BTreeMap<AgentId, AgentBelief> {
        &self.agents
    }

    pub fn agent(&self, id: &AgentId) -> Option<&AgentBelief> {
        self.agents.get(id)
    }

    /// Free items nobody else has claimed.
    pub fn free_items(&self) -> impl Iterator<Item = &Item> {
        self.items
            .values()
            .filter(|i| i.carrier.is_none() && !self.assigned_elsewhere.contains(&i.id))
    }

    pub fn carried_value(&self) -> u32 {
        self.carried.values().map(|c| c.reward).sum()
    }

    pub fn is_assigned_elsewhere(&self, id: &ItemId) -> bool {
        self.assigned_elsewhere.contains(id)
    }

    /// Exclude `id` from local pickup; cleared only when the item is forgotten.
    pub fn mark_assigned_elsewhere(&mut self, id: &ItemId) {
        self.assigned_elsewhere.insert(id.clone());
    }

    fn in_item_range(&self, cell: Cell) -> bool {
        match self.my_cell() {
            Some(me) => me.manhattan(cell) < self.config.item_observation_radius,
            None => false,
        }
    }

    fn in_agent_range(&self, cell: Cell) -> bool {
        match self.my_cell() {
            Some(me) => me.manhattan(cell) < self.config.agent_observation_radius,
            None => false,
        }
    }

    fn remove_item(&mut self, id: &ItemId) -> bool {
        self.assigned_elsewhere.remove(id);
        self.items.remove(id).is_some()
    }

    /// Returns `true` when the settled cell changed.
    pub fn observe_self(&mut self, sighting: &SelfSighting, now: Timestamp) -> bool {
        if !sighting.position().is_finite() {
            return false;
        }
        self.me.id = Some(sighting.id.clone());
        self.me.name = sighting.name.clone();
        self.me.score = sighting.score;
        self.set_position(sighting.position(), now)
    }

    /// Record a position confirmed by the actuator. Returns `true` when the settled cell changed.
    pub fn set_position(&mut self, position: Position, now: Timestamp) -> bool {
        if !position.is_finite() {
            return false;
        }
        let before = self.me.cell();
        self.me.updated_at = now;
        self.me.position = Some(position);

        let after = position.nearest_cell();
        if before != Some(after) {
            if let Some(prev) = before {
                self.me.previous_cell = Some(prev);
            }
            return true;
        }
        false
    }

    pub fn observe_items(&mut self, sightings: &[ItemSighting], now: Timestamp) -> ItemUpdate {
        let mut update = ItemUpdate::default();
        let mut seen: BTreeSet<ItemId> = BTreeSet::new();
        let me = self.me.id.clone();

        for s in sightings {
            let position = s.position();
            if !position.is_finite() {
                continue;
            }
            seen.insert(s.id.clone());

            match &s.carried_by {
                Some(carrier) if Some(carrier) == me.as_ref() => {
                    if self.remove_item(&s.id) {
                        update.changed = true;
                    }
                    let entry = self
                        .carried
                        .entry(s.id.clone())
                        .or_insert_with(|| CarriedItem::new(s.id.clone(), s.reward, now));
                    entry.reward = s.reward;
                    entry.decayed_at = now;
                }
                Some(carrier) => {
                    trace!(item = %s.id, carrier = %carrier, "item carried by another agent");
                    if self.remove_item(&s.id) {
                        update.removed.push(s.id.clone());
                        update.changed = true;
                    }
                    self.carried.remove(&s.id);
                }
                None => {
                    if !position.is_settled() {
                        continue;
                    }
                    if self.carried.remove(&s.id).is_some() {
                        update.changed = true;
                    }
                    if s.reward <= self.config.reward_floor {
                        if self.remove_item(&s.id) {
                            update.removed.push(s.id.clone());
                            update.changed = true;
                        }
                        continue;
                    }
                    let cell = position.nearest_cell();
                    match self.items.get_mut(&s.id) {
                        Some(item) => {
                            if item.cell != cell || item.reward != s.reward {
                                update.changed = true;
                            }
                            item.cell = cell;
                            item.reward = s.reward;
                            item.observed_at = now;
                            item.decayed_at = now;
                            item.carrier = None;
                        }
                        None => {
                            self.items
                                .insert(s.id.clone(), Item::new(s.id.clone(), cell, s.reward, now));
                            update.changed = true;
                        }
                    }
                }
            }
        }

        // Absence inside sensing range means the item is gone.
        let vanished: Vec<ItemId> = self
            .items
            .values()
            .filter(|i| !seen.contains(&i.id) && self.in_item_range(i.cell))
            .map(|i| i.id.clone())
            .collect();
        for id in vanished {
            debug!(item = %id, "tracked item no longer in view");
            self.remove_item(&id);
            update.removed.push(id);
            update.changed = true;
        }

        // Carried items travel with us, so they are always in range.
        if self.me.position.is_some() {
            let dropped: Vec<ItemId> = self
                .carried
                .keys()
                .filter(|id| !seen.contains(*id))
                .cloned()
                .collect();
            for id in dropped {
                self.carried.remove(&id);
                update.changed = true;
            }
        }

        update
    }

    pub fn observe_agents(
        &mut self,
        sightings: &[AgentSighting],
        now: Timestamp,
        graph: &mut NavGraph,
    ) -> AgentUpdate {
        let mut update = AgentUpdate::default();
        let mut seen: BTreeSet<AgentId> = BTreeSet::new();

        for s in sightings {
            if self.me.id.as_ref() == Some(&s.id) {
                continue;
            }
            let position = s.position();
            if !position.is_finite() {
                continue;
            }
            seen.insert(s.id.clone());
            let cells = position.occupied_cells();

            match self.agents.get_mut(&s.id) {
                Some(belief) => {
                    if belief.position != position || belief.visibility != Visibility::Visible {
                        update.changed = true;
                    }
                    let direction = heading(belief.position, position).or(belief.direction);
                    graph.unblock(&s.id, &belief.cells);
                    graph.block(&s.id, &cells);
                    belief.direction = if belief.position == position && position.is_settled() {
                        None
                    } else {
                        direction
                    };
                    belief.position = position;
                    belief.cells = cells;
                    belief.updated_at = now;
                    belief.visibility = Visibility::Visible;
                    belief.score = s.score;
                }
                None => {
                    debug!(agent = %s.id, x = s.x, y = s.y, "new agent sighted");
                    graph.block(&s.id, &cells);
                    self.agents.insert(
                        s.id.clone(),
                        AgentBelief {
                            id: s.id.clone(),
                            position,
                            updated_at: now,
                            direction: None,
                            cells,
                            visibility: Visibility::Visible,
                            score: s.score,
                        },
                    );
                    update.changed = true;
                }
            }
        }

        let unseen: Vec<AgentId> = self
            .agents
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for id in unseen {
            let Some(belief) = self.agents.get(&id) else { continue };
            let next = match belief.visibility {
                Visibility::Visible if self.in_agent_range(belief.last_cell()) => Visibility::Unknown,
                Visibility::Visible => Visibility::OutOfRange,
                Visibility::OutOfRange if self.in_agent_range(belief.last_cell()) => {
                    Visibility::Unknown
                }
                Visibility::OutOfRange
                    if now.elapsed_since(belief.updated_at) > self.agent_expiry =>
                {
                    Visibility::Unknown
                }
                other => other,
            };
            if next == belief.visibility {
                continue;
            }
            let cells = belief.cells.clone();
            if !next.reserves_cells() {
                graph.unblock(&id, &cells);
                update.released.push(id.clone());
            }
            if let Some(belief) = self.agents.get_mut(&id) {
                debug!(agent = %id, from = ?belief.visibility, to = ?next, "agent visibility changed");
                belief.visibility = next;
            }
            update.changed = true;
        }

        update
    }

    /// Apply elapsed decay. Returns the free items that reached the reward floor.
    pub fn decay_tick(&mut self, now: Timestamp) -> Vec<ItemId> {
        let interval = self.config.decay_interval;
        let Some(step) = interval.as_duration() else {
            return Vec::new();
        };
        let floor = self.config.reward_floor;

        let mut expired = Vec::new();
        for item in self.items.values_mut() {
            let n = interval.intervals_in(now.elapsed_since(item.decayed_at));
            if n == 0 {
                continue;
            }
            item.decayed_at = item.decayed_at.plus(step * n.min(u32::MAX as u64) as u32);
            item.reward = item.reward.saturating_sub(n.min(u32::MAX as u64) as u32);
            if item.reward <= floor {
                expired.push(item.id.clone());
            }
        }
        for id in &expired {
            debug!(item = %id, "item decayed away");
            self.remove_item(id);
        }

        let mut spoiled = Vec::new();
        for carried in self.carried.values_mut() {
            let n = interval.intervals_in(now.elapsed_since(carried.decayed_at));
            if n == 0 {
                continue;
            }
            carried.decayed_at = carried.decayed_at.plus(step * n.min(u32::MAX as u64) as u32);
            carried.reward = carried.reward.saturating_sub(n.min(u32::MAX as u64) as u32);
            if carried.reward <= floor {
                spoiled.push(carried.id.clone());
            }
        }
        for id in spoiled {
            self.carried.remove(&id);
        }

        expired
    }

    /// Move picked items from the free set into the carried set.
    pub fn confirm_pickup(&mut self, ids: &[ItemId], now: Timestamp) -> usize {
        let mut moved = 0;
        for id in ids {
            if let Some(item) = self.items.remove(id) {
                self.assigned_elsewhere.remove(id);
                let mut carried = CarriedItem::new(id.clone(), item.reward, now);
                carried.decayed_at = item.decayed_at;
                self.carried.insert(id.clone(), carried);
                moved += 1;
            }
        }
        moved
    }

    pub fn confirm_putdown(&mut self, ids: &[ItemId]) -> u32 {
        ids.iter()
            .filter_map(|id| self.carried.remove(id))
            .map(|c| c.reward)
            .sum()
    }

    /// Drop carried items at `cell` for a peer to collect; they must not be picked up locally.
    pub fn reassign_to_peer(&mut self, ids: &[ItemId], cell: Cell, now: Timestamp) {
        for id in ids {
            let Some(carried) = self.carried.remove(id) else { continue };
            let mut item = Item::new(id.clone(), cell, carried.reward, now);
            item.decayed_at = carried.decayed_at;
            self.items.insert(id.clone(), item);
            self.assigned_elsewhere.insert(id.clone());
        }
    }

    /// Drop an item on the peer's word that it is gone.
    pub fn forget_item(&mut self, id: &ItemId) -> bool {
        self.remove_item(id)
    }

    /// Adopt a peer's item record if it is strictly newer than ours.
    pub fn adopt_remote_item(&mut self, remote: &Item) -> bool {
        if self.carried.contains_key(&remote.id) {
            return false;
        }
        if let Some(local) = self.items.get(&remote.id) {
            if local.observed_at >= remote.observed_at {
                return false;
            }
        }
        match &remote.carrier {
            Some(carrier) if self.me.id.as_ref() != Some(carrier) => self.remove_item(&remote.id),
            Some(_) => false,
            None if remote.reward <= self.config.reward_floor => false,
            None => {
                self.items.insert(remote.id.clone(), remote.clone());
                true
            }
        }
    }

    /// Adopt a peer's agent record if it is strictly newer, swapping the graph reservation.
    pub fn adopt_remote_agent(&mut self, remote: &AgentBelief, graph: &mut NavGraph) -> bool {
        if self.me.id.as_ref() == Some(&remote.id) {
            return false;
        }
        if let Some(local) = self.agents.get(&remote.id) {
            if local.updated_at >= remote.updated_at {
                return false;
            }
            graph.unblock(&local.id, &local.cells);
        }
        if remote.visibility.reserves_cells() {
            graph.block(&remote.id, &remote.cells);
        }
        self.agents.insert(remote.id.clone(), remote.clone());
        true
    }

    /// Re-apply every agent reservation, e.g. after the graph was rebuilt.
    pub fn reapply_reservations(&self, graph: &mut NavGraph) {
        for belief in self.agents.values() {
            if belief.visibility.reserves_cells() {
                graph.block(&belief.id, &belief.cells);
            }
        }
    }
}
