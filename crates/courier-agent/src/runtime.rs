use std::sync::Arc;

use courier_belief::{SenseEvent, World};
use courier_core::{AgentId, CancelToken, SimConfig, SplitMix64, Timestamp};
use courier_intent::{
    generate_options, score, still_valid, Goal, GoalKey, IntentionScheduler, ScoreContext,
};
use courier_negotiate::{role_for, Envelope, NegotiationChannel, PeerLink, Role};
use courier_plan::{Actuator, PlanContext, PlanError, PlanLibrary};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::AgentConfig;

/// A refused claim marks the item taken and goal generation runs again, at most this often.
const MAX_CLAIMS_PER_REPLAN: usize = 3;

/// One courier: beliefs, intentions, plans and an optional peer.
pub struct Agent {
    id: AgentId,
    config: AgentConfig,
    world: Arc<Mutex<World>>,
    scheduler: Arc<Mutex<IntentionScheduler>>,
    plan: PlanContext,
    library: PlanLibrary,
    channel: Option<NegotiationChannel>,
    peer: Option<AgentId>,
    notify: Notify,
    root: CancelToken,
    replan_gate: Mutex<()>,
}

impl Agent {
    pub fn new(id: AgentId, config: AgentConfig, actuator: Arc<dyn Actuator>) -> Self {
        let mut world = World::new(SimConfig::default(), config.seed)
            .with_candidate_limit(config.candidate_limit)
            .with_agent_expiry(config.agent_expiry());
        world.rng = SplitMix64::for_agent(config.seed, id.stable_id());
        let world = Arc::new(Mutex::new(world));

        let root = CancelToken::new();
        let plan = PlanContext::new(Arc::clone(&world), actuator).with_limits(config.plan.clone());
        Self {
            id,
            world,
            scheduler: Arc::new(Mutex::new(IntentionScheduler::new(root.clone()))),
            plan,
            library: PlanLibrary::default(),
            channel: None,
            peer: None,
            notify: Notify::new(),
            root,
            replan_gate: Mutex::new(()),
            config,
        }
    }

    /// Connect to a cooperating peer. The role comes from the config, else from the two ids.
    pub fn with_peer(mut self, peer: &AgentId, link: Arc<dyn PeerLink>) -> Self {
        let role = role_for(&self.id, peer, self.config.negotiation.role);
        info!(agent = %self.id, peer = %peer, role = ?role, "peer connected");
        self.channel = Some(NegotiationChannel::new(
            link,
            role,
            self.config.negotiation.clone(),
        ));
        self.peer = Some(peer.clone());
        self
    }

    pub fn with_library(mut self, library: PlanLibrary) -> Self {
        self.library = library;
        self
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn role(&self) -> Option<Role> {
        self.channel.as_ref().map(NegotiationChannel::role)
    }

    pub fn world(&self) -> &Arc<Mutex<World>> {
        &self.world
    }

    pub fn scheduler(&self) -> &Arc<Mutex<IntentionScheduler>> {
        &self.scheduler
    }

    /// Apply a batch of perception events, announce vanished items and replan if needed.
    pub async fn perceive(&self, events: &[SenseEvent]) {
        let now = Timestamp::now();
        let mut removed = Vec::new();
        let mut replan = false;
        {
            let mut world = self.world.lock().await;
            for event in events {
                let applied = world.apply(event, now);
                replan |= applied.replan;
                removed.extend(applied.removed_items);
            }
        }

        if !removed.is_empty() {
            {
                let mut scheduler = self.scheduler.lock().await;
                for id in &removed {
                    scheduler.drop_goal(&GoalKey::PickUp(id.clone()));
                }
            }
            if let Some(channel) = &self.channel {
                channel.notify_deleted(&removed).await;
            }
        }

        if replan {
            self.replan().await;
        }
    }

    /// Generate the current best goal and queue it.
    ///
    /// A secondary agent claims an item from the primary before queueing a pickup it does not
    /// already hold, as long as it has sighted the primary. Returns whether a goal was pushed.
    pub async fn replan(&self) -> bool {
        let _gate = self.replan_gate.lock().await;
        for _ in 0..MAX_CLAIMS_PER_REPLAN {
            let now = Timestamp::now();
            let (goal, claim) = {
                let world = self.world.lock().await;
                if !world.has_map() || world.my_cell().is_none() {
                    return false;
                }
                let goal = generate_options(&world, &self.config.score, now);
                let claim = match (&goal, &self.channel) {
                    (Goal::PickUp { item, .. }, Some(channel))
                        if channel.role() == Role::Secondary && self.peer_known(&world) =>
                    {
                        let held = self.scheduler.lock().await.top_pickup_for(item).is_some();
                        let value = score(&goal, &ScoreContext::new(&world, &self.config.score, now));
                        (!held).then(|| (item.clone(), value))
                    }
                    _ => None,
                };
                (goal, claim)
            };

            if let (Some((item, value)), Some(channel)) = (claim, &self.channel) {
                if !channel.claim(&self.world, &item, value).await {
                    continue;
                }
            }

            let outcome = {
                let world = self.world.lock().await;
                if !still_valid(&goal, &world) {
                    continue;
                }
                let ctx = ScoreContext::new(&world, &self.config.score, Timestamp::now());
                self.scheduler.lock().await.push(goal, &ctx)
            };
            if let Some(stopped) = outcome.stopped {
                debug!(agent = %self.id, stopped, head = outcome.id, "intention preempted");
            }
            self.notify.notify_one();
            return true;
        }
        false
    }

    fn peer_known(&self, world: &World) -> bool {
        self.peer
            .as_ref()
            .is_some_and(|peer| world.beliefs.agent(peer).is_some())
    }

    /// Run the head intention's plan once and settle it. `None` when the queue is empty.
    pub async fn run_once(&self) -> Option<Result<&'static str, PlanError>> {
        let (id, goal, cancel) = {
            let world = self.world.lock().await;
            let mut scheduler = self.scheduler.lock().await;
            for dropped in scheduler.drop_invalid_heads(&world) {
                debug!(agent = %self.id, goal = %dropped.goal, "dropped invalid intention");
            }
            scheduler.activate_head()?
        };

        debug!(agent = %self.id, intention = id, goal = %goal, "intention active");
        let result = self.library.execute(&self.plan, &goal, &cancel).await;

        let mut scheduler = self.scheduler.lock().await;
        match &result {
            Ok(plan) => {
                scheduler.complete(id);
                info!(agent = %self.id, plan = *plan, goal = %goal, "intention achieved");
            }
            Err(PlanError::Stopped) => {
                if scheduler.requeue_stopped(id) {
                    debug!(agent = %self.id, goal = %goal, "intention requeued");
                }
            }
            Err(err) => {
                scheduler.fail(id);
                warn!(agent = %self.id, goal = %goal, error = %err, "intention failed");
            }
        }
        Some(result)
    }

    async fn wait_for_work(&self) {
        let _ = tokio::time::timeout(self.config.idle_poll(), self.notify.notified()).await;
    }

    async fn scheduler_loop(self: Arc<Self>) {
        while !self.root.is_cancelled() {
            match self.run_once().await {
                Some(Ok(_)) | Some(Err(PlanError::Stopped)) => {
                    self.replan().await;
                }
                Some(Err(_)) => {
                    self.wait_for_work().await;
                    self.replan().await;
                }
                None => {
                    if !self.replan().await {
                        self.wait_for_work().await;
                    }
                }
            }
            tokio::task::yield_now().await;
        }
        debug!(agent = %self.id, "scheduler loop stopped");
    }

    async fn perception_loop(self: Arc<Self>, mut senses: mpsc::Receiver<SenseEvent>) {
        while let Some(event) = senses.recv().await {
            if self.root.is_cancelled() {
                break;
            }
            let mut batch = vec![event];
            while let Ok(more) = senses.try_recv() {
                batch.push(more);
            }
            self.perceive(&batch).await;
        }
        debug!(agent = %self.id, "perception loop stopped");
    }

    async fn message_loop(self: Arc<Self>, mut inbox: mpsc::Receiver<Envelope>) {
        let Some(channel) = &self.channel else {
            return;
        };
        while let Some(envelope) = inbox.recv().await {
            if self.root.is_cancelled() {
                break;
            }
            match channel
                .handle_incoming(envelope, &self.world, &self.scheduler)
                .await
            {
                Ok(incoming) if incoming.replan() => {
                    self.replan().await;
                }
                Ok(_) => {}
                Err(err) => warn!(agent = %self.id, error = %err, "dropped peer message"),
            }
        }
        debug!(agent = %self.id, "message loop stopped");
    }

    async fn broadcast_loop(self: Arc<Self>) {
        let Some(channel) = &self.channel else {
            return;
        };
        let mut ticker = tokio::time::interval(channel.config().broadcast_interval());
        loop {
            ticker.tick().await;
            if self.root.is_cancelled() {
                break;
            }
            if let Err(err) = channel.broadcast(&self.world).await {
                debug!(agent = %self.id, error = %err, "state sync not sent");
            }
        }
    }

    /// Start the agent's tasks.
    ///
    /// `inbox` carries the peer's messages and is ignored without a peer.
    pub fn spawn(
        self,
        senses: mpsc::Receiver<SenseEvent>,
        inbox: Option<mpsc::Receiver<Envelope>>,
    ) -> AgentHandle {
        let agent = Arc::new(self);
        let mut tasks = vec![
            tokio::spawn(Arc::clone(&agent).perception_loop(senses)),
            tokio::spawn(Arc::clone(&agent).scheduler_loop()),
        ];
        if agent.channel.is_some() {
            tasks.push(tokio::spawn(Arc::clone(&agent).broadcast_loop()));
            if let Some(inbox) = inbox {
                tasks.push(tokio::spawn(Arc::clone(&agent).message_loop(inbox)));
            }
        }
        info!(agent = %agent.id, tasks = tasks.len(), "agent started");
        AgentHandle { agent, tasks }
    }
}

/// A running agent.
pub struct AgentHandle {
    agent: Arc<Agent>,
    tasks: Vec<JoinHandle<()>>,
}

impl AgentHandle {
    pub fn id(&self) -> &AgentId {
        self.agent.id()
    }

    pub fn role(&self) -> Option<Role> {
        self.agent.role()
    }

    pub fn world(&self) -> &Arc<Mutex<World>> {
        self.agent.world()
    }

    pub fn scheduler(&self) -> &Arc<Mutex<IntentionScheduler>> {
        self.agent.scheduler()
    }

    /// Cancel every intention and wait for the tasks to wind down.
    pub async fn stop(self) {
        self.agent.root.cancel();
        self.agent.scheduler.lock().await.clear();
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    warn!(agent = %self.agent.id, error = %err, "agent task panicked");
                }
            }
        }
        info!(agent = %self.agent.id, "agent stopped");
    }
}
