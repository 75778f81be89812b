use std::collections::BTreeMap;

use courier_belief::{AgentBelief, Item, Visibility, World};
use courier_core::{AgentId, ItemId};
use tracing::trace;

use crate::{AgentSnapshot, PeerMessage};

/// Snapshot of our free items and agent beliefs, ourselves included.
pub fn state_sync(world: &World) -> PeerMessage {
    let beliefs = &world.beliefs;
    let free_items: BTreeMap<ItemId, Item> = beliefs
        .items()
        .values()
        .filter(|i| i.carrier.is_none())
        .map(|i| (i.id.clone(), i.clone()))
        .collect();

    let mut peer_agents: BTreeMap<AgentId, AgentSnapshot> = beliefs
        .agents()
        .iter()
        .map(|(id, belief)| {
            (
                id.clone(),
                AgentSnapshot {
                    belief: belief.clone(),
                    is_self: false,
                },
            )
        })
        .collect();

    let me = beliefs.me();
    if let (Some(id), Some(position)) = (me.id.clone(), me.position) {
        peer_agents.insert(
            id.clone(),
            AgentSnapshot {
                belief: AgentBelief {
                    id,
                    position,
                    updated_at: me.updated_at,
                    direction: None,
                    cells: position.occupied_cells(),
                    visibility: Visibility::Visible,
                    score: me.score,
                },
                is_self: true,
            },
        );
    }

    PeerMessage::StateSync {
        free_items,
        peer_agents,
    }
}

/// Adopt every strictly newer record. Records about ourselves are ignored.
pub fn merge_state_sync(
    world: &mut World,
    free_items: &BTreeMap<ItemId, Item>,
    peer_agents: &BTreeMap<AgentId, AgentSnapshot>,
) -> bool {
    let mut changed = false;
    for (id, item) in free_items {
        if &item.id != id {
            continue;
        }
        if world.beliefs.adopt_remote_item(item) {
            trace!(item = %item.id, "adopted peer item");
            changed = true;
        }
    }

    let me = world.beliefs.my_id().cloned();
    for (id, snapshot) in peer_agents {
        if me.as_ref() == Some(id) || &snapshot.belief.id != id {
            continue;
        }
        if world
            .beliefs
            .adopt_remote_agent(&snapshot.belief, &mut world.graph)
        {
            trace!(agent = %id, "adopted peer agent record");
            changed = true;
        }
    }
    changed
}
