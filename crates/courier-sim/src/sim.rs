use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_belief::{AgentSighting, ItemSighting, SelfSighting, SenseEvent};
use courier_core::{
    AgentId, Cell, DeterministicRng, Direction, ItemId, Position, SimConfig, SplitMix64, TileKind,
    TileMap, Timestamp,
};
use courier_plan::{ActError, Actuator};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::SpawnPolicy;

#[derive(Debug, Clone)]
struct SimItem {
    cell: Cell,
    reward: u32,
    carrier: Option<AgentId>,
    decayed_at: Timestamp,
}

#[derive(Debug, Clone)]
struct SimAgent {
    cell: Cell,
    score: i64,
}

#[derive(Debug)]
struct State {
    config: SimConfig,
    map: TileMap,
    items: BTreeMap<ItemId, SimItem>,
    agents: BTreeMap<AgentId, SimAgent>,
    next_item: u64,
    rng: SplitMix64,
}

impl State {
    fn occupied(&self, cell: Cell, except: &AgentId) -> bool {
        self.agents.iter().any(|(id, a)| id != except && a.cell == cell)
    }

    fn carried_by(&self, id: &AgentId) -> usize {
        self.items
            .values()
            .filter(|i| i.carrier.as_ref() == Some(id))
            .count()
    }

    fn insert_item(&mut self, cell: Cell, reward: u32, now: Timestamp) -> ItemId {
        self.next_item += 1;
        let id = ItemId::new(format!("p{}", self.next_item));
        self.items.insert(
            id.clone(),
            SimItem {
                cell,
                reward,
                carrier: None,
                decayed_at: now,
            },
        );
        id
    }
}

/// Authoritative grid state shared by every actuator and sensor.
#[derive(Clone)]
pub struct LocalSim {
    state: Arc<Mutex<State>>,
}

impl LocalSim {
    pub fn new(map: TileMap, config: SimConfig, seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                config,
                map,
                items: BTreeMap::new(),
                agents: BTreeMap::new(),
                next_item: 0,
                rng: SplitMix64::new(seed),
            })),
        }
    }

    pub async fn config(&self) -> SimConfig {
        self.state.lock().await.config.clone()
    }

    /// Place an item; `None` when the cell cannot hold one.
    pub async fn spawn_item(&self, cell: Cell, reward: u32) -> Option<ItemId> {
        let mut s = self.state.lock().await;
        if !s.map.is_traversable(cell) || reward <= s.config.reward_floor {
            return None;
        }
        Some(s.insert_item(cell, reward, Timestamp::now()))
    }

    /// Drop an item on a random free spawner, following `policy`.
    pub async fn spawn_random(&self, policy: &SpawnPolicy) -> Option<ItemId> {
        let mut s = self.state.lock().await;
        let free_items = s.items.values().filter(|i| i.carrier.is_none()).count();
        if free_items >= policy.max_items {
            return None;
        }
        let spots: Vec<Cell> = s
            .map
            .spawner_cells()
            .into_iter()
            .filter(|c| !s.items.values().any(|i| i.carrier.is_none() && i.cell == *c))
            .collect();
        if spots.is_empty() {
            return None;
        }
        let cell = spots[s.rng.next_below(spots.len())];
        let span = policy.reward_max.saturating_sub(policy.reward_min) as usize + 1;
        let reward = policy.reward_min + s.rng.next_below(span) as u32;
        if reward <= s.config.reward_floor {
            return None;
        }
        let id = s.insert_item(cell, reward, Timestamp::now());
        trace!(item = %id, cell = %cell, reward, "item spawned");
        Some(id)
    }

    /// Register an agent and hand back its actuator.
    pub async fn add_agent(&self, id: AgentId, cell: Cell) -> Option<SimActuator> {
        let mut s = self.state.lock().await;
        if !s.map.is_traversable(cell) || s.occupied(cell, &id) {
            return None;
        }
        s.agents.insert(id.clone(), SimAgent { cell, score: 0 });
        info!(agent = %id, cell = %cell, "agent joined");
        Some(SimActuator {
            sim: self.clone(),
            id,
        })
    }

    pub async fn score_of(&self, id: &AgentId) -> Option<i64> {
        self.state.lock().await.agents.get(id).map(|a| a.score)
    }

    pub async fn agent_cell(&self, id: &AgentId) -> Option<Cell> {
        self.state.lock().await.agents.get(id).map(|a| a.cell)
    }

    pub async fn item_count(&self) -> usize {
        self.state.lock().await.items.len()
    }

    /// Events a freshly connected agent receives once.
    pub async fn initial_events(&self) -> Vec<SenseEvent> {
        let s = self.state.lock().await;
        vec![
            SenseEvent::Config(s.config.clone()),
            SenseEvent::Map(s.map.clone()),
        ]
    }

    /// What `id` currently perceives: itself, items in range, agents in range.
    pub async fn sense(&self, id: &AgentId) -> Vec<SenseEvent> {
        let s = self.state.lock().await;
        let Some(me) = s.agents.get(id) else {
            return Vec::new();
        };
        let item_radius = s.config.item_observation_radius;
        let agent_radius = s.config.agent_observation_radius;

        let items = s
            .items
            .iter()
            .filter(|(_, i)| me.cell.manhattan(i.cell) < item_radius)
            .map(|(item_id, i)| ItemSighting {
                id: item_id.clone(),
                x: f64::from(i.cell.x),
                y: f64::from(i.cell.y),
                reward: i.reward,
                carried_by: i.carrier.clone(),
            })
            .collect();
        let agents = s
            .agents
            .iter()
            .filter(|(other, a)| *other != id && me.cell.manhattan(a.cell) < agent_radius)
            .map(|(other, a)| AgentSighting {
                id: other.clone(),
                x: f64::from(a.cell.x),
                y: f64::from(a.cell.y),
                score: a.score,
            })
            .collect();

        vec![
            SenseEvent::You(SelfSighting {
                id: id.clone(),
                name: Some(id.to_string()),
                x: f64::from(me.cell.x),
                y: f64::from(me.cell.y),
                score: me.score,
            }),
            SenseEvent::Items(items),
            SenseEvent::Agents(agents),
        ]
    }

    /// Apply reward decay up to `now`; returns how many items vanished.
    pub async fn decay(&self, now: Timestamp) -> usize {
        let mut s = self.state.lock().await;
        let interval = s.config.decay_interval;
        let Some(step) = interval.as_duration() else {
            return 0;
        };
        let floor = s.config.reward_floor;
        for item in s.items.values_mut() {
            let n = interval.intervals_in(now.elapsed_since(item.decayed_at));
            if n == 0 {
                continue;
            }
            let n = n.min(u64::from(u32::MAX)) as u32;
            item.decayed_at = item.decayed_at.plus(step * n);
            item.reward = item.reward.saturating_sub(n);
        }
        let before = s.items.len();
        s.items.retain(|_, i| i.reward > floor);
        before - s.items.len()
    }

    /// Stream the initial events, then a fresh perception every `period`, until the receiver goes.
    pub fn spawn_sensor(
        &self,
        id: AgentId,
        tx: mpsc::Sender<SenseEvent>,
        period: Duration,
    ) -> JoinHandle<()> {
        let sim = self.clone();
        tokio::spawn(async move {
            for event in sim.initial_events().await {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    return;
                }
                for event in sim.sense(&id).await {
                    if tx.send(event).await.is_err() {
                        debug!(agent = %id, "sensor stopped");
                        return;
                    }
                }
            }
        })
    }

    /// Decay rewards every `period` and, under a spawn policy, drop new items at its own pace.
    pub fn spawn_clock(&self, spawn: Option<SpawnPolicy>, period: Duration) -> JoinHandle<()> {
        let sim = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut last_spawn = Timestamp::now();
            loop {
                ticker.tick().await;
                let now = Timestamp::now();
                let gone = sim.decay(now).await;
                if gone > 0 {
                    trace!(gone, "items decayed away");
                }
                if let Some(policy) = &spawn {
                    if now.elapsed_since(last_spawn) >= policy.interval() {
                        last_spawn = now;
                        sim.spawn_random(policy).await;
                    }
                }
            }
        })
    }
}

/// Acts for one agent inside a [`LocalSim`].
#[derive(Clone)]
pub struct SimActuator {
    sim: LocalSim,
    id: AgentId,
}

impl SimActuator {
    pub fn id(&self) -> &AgentId {
        &self.id
    }
}

#[async_trait]
impl Actuator for SimActuator {
    async fn step(&self, direction: Direction) -> Result<Option<Position>, ActError> {
        let pause = self.sim.state.lock().await.config.movement_duration();
        tokio::time::sleep(pause).await;

        let mut s = self.sim.state.lock().await;
        let from = s
            .agents
            .get(&self.id)
            .map(|a| a.cell)
            .ok_or(ActError::Disconnected)?;
        let to = from.step(direction);
        if !s.map.is_traversable(to) || s.occupied(to, &self.id) {
            return Ok(None);
        }
        if let Some(agent) = s.agents.get_mut(&self.id) {
            agent.cell = to;
        }
        for item in s.items.values_mut() {
            if item.carrier.as_ref() == Some(&self.id) {
                item.cell = to;
            }
        }
        Ok(Some(Position::from(to)))
    }

    async fn pick_up(&self) -> Result<Vec<ItemId>, ActError> {
        let mut s = self.sim.state.lock().await;
        let here = s
            .agents
            .get(&self.id)
            .map(|a| a.cell)
            .ok_or(ActError::Disconnected)?;
        let room = s.config.max_carried.saturating_sub(s.carried_by(&self.id));
        let picked: Vec<ItemId> = s
            .items
            .iter()
            .filter(|(_, i)| i.carrier.is_none() && i.cell == here)
            .map(|(id, _)| id.clone())
            .take(room)
            .collect();
        for id in &picked {
            if let Some(item) = s.items.get_mut(id) {
                item.carrier = Some(self.id.clone());
            }
        }
        Ok(picked)
    }

    async fn put_down(&self) -> Result<Vec<ItemId>, ActError> {
        let mut s = self.sim.state.lock().await;
        let here = s
            .agents
            .get(&self.id)
            .map(|a| a.cell)
            .ok_or(ActError::Disconnected)?;
        let dropped: Vec<ItemId> = s
            .items
            .iter()
            .filter(|(_, i)| i.carrier.as_ref() == Some(&self.id))
            .map(|(id, _)| id.clone())
            .collect();

        if s.map.kind(here) == TileKind::Delivery {
            let mut earned = 0i64;
            for id in &dropped {
                if let Some(item) = s.items.remove(id) {
                    earned += i64::from(item.reward);
                }
            }
            if let Some(agent) = s.agents.get_mut(&self.id) {
                agent.score += earned;
            }
            info!(agent = %self.id, earned, "delivery scored");
        } else {
            for id in &dropped {
                if let Some(item) = s.items.get_mut(id) {
                    item.carrier = None;
                    item.cell = here;
                }
            }
        }
        Ok(dropped)
    }
}
