use std::fmt;

use courier_belief::World;
use courier_core::{AgentId, Cell, ItemId};
use courier_nav::Route;

/// Something the agent may decide to pursue.
#[derive(Debug, Clone, PartialEq)]
pub enum Goal {
    PickUp { item: ItemId, route: Option<Route> },
    Deliver { route: Option<Route> },
    DeliverToPeer { peer: AgentId, route: Option<Route> },
    Idle,
}

/// Identity of a goal for deduplication: its kind plus the entity it targets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GoalKey {
    PickUp(ItemId),
    Deliver,
    DeliverToPeer(AgentId),
    Idle,
}

impl Goal {
    pub fn key(&self) -> GoalKey {
        match self {
            Goal::PickUp { item, .. } => GoalKey::PickUp(item.clone()),
            Goal::Deliver { .. } => GoalKey::Deliver,
            Goal::DeliverToPeer { peer, .. } => GoalKey::DeliverToPeer(peer.clone()),
            Goal::Idle => GoalKey::Idle,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Goal::PickUp { .. } => "pick_up",
            Goal::Deliver { .. } => "deliver",
            Goal::DeliverToPeer { .. } => "deliver_to_peer",
            Goal::Idle => "idle",
        }
    }

    pub fn route(&self) -> Option<&Route> {
        match self {
            Goal::PickUp { route, .. }
            | Goal::Deliver { route }
            | Goal::DeliverToPeer { route, .. } => route.as_ref(),
            Goal::Idle => None,
        }
    }

    /// Where the route ends, if there is one.
    pub fn destination(&self) -> Option<Cell> {
        self.route().and_then(Route::end)
    }

    pub fn item(&self) -> Option<&ItemId> {
        match self {
            Goal::PickUp { item, .. } => Some(item),
            _ => None,
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::PickUp { item, .. } => write!(f, "pick_up({item})"),
            Goal::Deliver { .. } => f.write_str("deliver"),
            Goal::DeliverToPeer { peer, .. } => write!(f, "deliver_to_peer({peer})"),
            Goal::Idle => f.write_str("idle"),
        }
    }
}

/// Whether `goal` still makes sense given current beliefs.
pub fn still_valid(goal: &Goal, world: &World) -> bool {
    let beliefs = &world.beliefs;
    match goal {
        Goal::PickUp { item, .. } => match beliefs.item(item) {
            Some(known) => known.carrier.is_none() && !beliefs.is_assigned_elsewhere(item),
            None => false,
        },
        Goal::Deliver { .. } => beliefs.is_carrying(),
        Goal::DeliverToPeer { peer, .. } => {
            beliefs.is_carrying()
                && beliefs
                    .agent(peer)
                    .is_some_and(|a| a.visibility.reserves_cells())
        }
        Goal::Idle => true,
    }
}
