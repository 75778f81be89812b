//! The intention queue.

use std::cmp::Ordering;

use courier_belief::World;
use courier_core::{CancelToken, ItemId};
use tracing::debug;

use crate::{score, still_valid, Goal, GoalKey, ScoreContext};

pub type IntentionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentionState {
    Created,
    Queued,
    Active,
    Completed,
    Failed,
    Stopped,
}

impl IntentionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, IntentionState::Completed | IntentionState::Failed)
    }
}

/// A committed goal, its latest score and the token its plan runs under.
#[derive(Debug, Clone)]
pub struct Intention {
    pub id: IntentionId,
    pub goal: Goal,
    pub score: f64,
    pub state: IntentionState,
    pub cancel: CancelToken,
}

impl Intention {
    pub fn key(&self) -> GoalKey {
        self.goal.key()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    pub id: IntentionId,
    /// `false` when an equivalent intention was refreshed instead.
    pub inserted: bool,
    /// Previously running head that was stopped because it lost first place.
    pub stopped: Option<IntentionId>,
}

/// Score-ordered queue with at most one intention per [`GoalKey`].
#[derive(Debug)]
pub struct IntentionScheduler {
    queue: Vec<Intention>,
    next_id: IntentionId,
    root: CancelToken,
}

impl Default for IntentionScheduler {
    fn default() -> Self {
        Self::new(CancelToken::new())
    }
}

impl IntentionScheduler {
    /// Every intention token is a child of `root`.
    pub fn new(root: CancelToken) -> Self {
        Self {
            queue: Vec::new(),
            next_id: 1,
            root,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intention> {
        self.queue.iter()
    }

    pub fn head(&self) -> Option<&Intention> {
        self.queue.first()
    }

    pub fn get(&self, id: IntentionId) -> Option<&Intention> {
        self.queue.iter().find(|i| i.id == id)
    }

    fn position(&self, id: IntentionId) -> Option<usize> {
        self.queue.iter().position(|i| i.id == id)
    }

    pub fn push(&mut self, goal: Goal, ctx: &ScoreContext<'_>) -> PushOutcome {
        let key = goal.key();
        let (id, inserted) = match self.queue.iter_mut().find(|i| i.key() == key) {
            Some(existing) => {
                existing.goal = goal;
                (existing.id, false)
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                let mut intention = Intention {
                    id,
                    goal,
                    score: 0.0,
                    state: IntentionState::Created,
                    cancel: self.root.child(),
                };
                debug!(intention = id, goal = %intention.goal, "intention queued");
                intention.state = IntentionState::Queued;
                self.queue.push(intention);
                (id, true)
            }
        };
        let stopped = self.rescore(ctx);
        PushOutcome {
            id,
            inserted,
            stopped,
        }
    }

    /// Re-score and stably re-sort, stopping the running head if it lost first place.
    pub fn rescore(&mut self, ctx: &ScoreContext<'_>) -> Option<IntentionId> {
        let before = self.head().map(|i| i.id);
        for intention in &mut self.queue {
            intention.score = score(&intention.goal, ctx);
        }
        self.queue
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        let after = self.head().map(|i| i.id);
        if before == after {
            return None;
        }
        let previous = before?;
        self.stop(previous).then_some(previous)
    }

    /// Cancel an active intention's plan. It stays queued until the runtime settles it.
    pub fn stop(&mut self, id: IntentionId) -> bool {
        let Some(intention) = self.queue.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        if intention.state != IntentionState::Active {
            return false;
        }
        debug!(intention = id, goal = %intention.goal, "preempting intention");
        intention.cancel.cancel();
        intention.state = IntentionState::Stopped;
        true
    }

    /// Mark the head active and hand out what its plan needs.
    pub fn activate_head(&mut self) -> Option<(IntentionId, Goal, CancelToken)> {
        let root = self.root.clone();
        let head = self.queue.first_mut()?;
        if head.cancel.is_cancelled() {
            head.cancel = root.child();
        }
        head.state = IntentionState::Active;
        Some((head.id, head.goal.clone(), head.cancel.clone()))
    }

    pub fn complete(&mut self, id: IntentionId) -> Option<Intention> {
        self.finish(id, IntentionState::Completed)
    }

    pub fn fail(&mut self, id: IntentionId) -> Option<Intention> {
        self.finish(id, IntentionState::Failed)
    }

    fn finish(&mut self, id: IntentionId, state: IntentionState) -> Option<Intention> {
        let idx = self.position(id)?;
        let mut intention = self.queue.remove(idx);
        intention.state = state;
        Some(intention)
    }

    /// Put a stopped intention back in line with a fresh token.
    pub fn requeue_stopped(&mut self, id: IntentionId) -> bool {
        let root = self.root.clone();
        let Some(intention) = self.queue.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        if !matches!(
            intention.state,
            IntentionState::Stopped | IntentionState::Active
        ) {
            return false;
        }
        intention.state = IntentionState::Queued;
        intention.cancel = root.child();
        true
    }

    /// Remove the intention for `key`, cancelling its plan if it is running.
    pub fn drop_goal(&mut self, key: &GoalKey) -> Option<Intention> {
        let idx = self.queue.iter().position(|i| &i.key() == key)?;
        let mut intention = self.queue.remove(idx);
        debug!(intention = intention.id, goal = %intention.goal, "intention dropped");
        intention.cancel.cancel();
        intention.state = IntentionState::Stopped;
        Some(intention)
    }

    /// Pop heads whose goal no longer makes sense.
    pub fn drop_invalid_heads(&mut self, world: &World) -> Vec<Intention> {
        let mut dropped = Vec::new();
        while let Some(head) = self.queue.first() {
            if still_valid(&head.goal, world) {
                break;
            }
            let mut intention = self.queue.remove(0);
            debug!(intention = intention.id, goal = %intention.goal, "head no longer valid");
            intention.cancel.cancel();
            intention.state = IntentionState::Failed;
            dropped.push(intention);
        }
        dropped
    }

    /// Highest ranked pickup intention for `item`.
    pub fn top_pickup_for(&self, item: &ItemId) -> Option<&Intention> {
        self.queue
            .iter()
            .find(|i| matches!(&i.goal, Goal::PickUp { item: it, .. } if it == item))
    }

    /// Cancel everything; used on shutdown.
    pub fn clear(&mut self) {
        for intention in self.queue.drain(..) {
            intention.cancel.cancel();
        }
    }
}
