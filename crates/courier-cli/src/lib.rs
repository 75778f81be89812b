//! Drives one or two agents through a scenario on the in-process simulator.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Result};
use courier_agent::{Agent, AgentConfig, AgentHandle};
use courier_core::AgentId;
use courier_sim::{Inbox, LocalLink, LocalSim, Scenario};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of each peer inbox.
const PEER_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentScore {
    pub id: AgentId,
    pub score: i64,
}

/// Outcome of a bounded run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub seconds: f64,
    pub scores: Vec<AgentScore>,
    pub items_left: usize,
}

impl RunSummary {
    pub fn total(&self) -> i64 {
        self.scores.iter().map(|s| s.score).sum()
    }
}

/// Run the first `agents` agents of `scenario` for `duration`, then stop and report scores.
pub async fn run_scenario(
    scenario: &Scenario,
    config: &AgentConfig,
    agents: usize,
    duration: Duration,
) -> Result<RunSummary> {
    ensure!(
        (1..=2).contains(&agents),
        "courier runs one or two agents, got {agents}"
    );
    ensure!(
        scenario.agents.len() >= agents,
        "scenario lists {} agent(s), {agents} requested",
        scenario.agents.len()
    );

    let (sim, actuators) = scenario.build(agents).await?;
    let ids: Vec<AgentId> = actuators.iter().map(|a| a.id().clone()).collect();
    let mut background: Vec<JoinHandle<()>> =
        vec![sim.spawn_clock(scenario.spawn.clone(), scenario.sense_interval())];

    let links: Vec<Option<(AgentId, LocalLink, Inbox)>> = match ids.as_slice() {
        [a, b] => {
            let ((link_a, inbox_a), (link_b, inbox_b)) =
                LocalLink::pair(a.clone(), b.clone(), PEER_BUFFER);
            vec![
                Some((b.clone(), link_a, inbox_a)),
                Some((a.clone(), link_b, inbox_b)),
            ]
        }
        _ => vec![None],
    };

    let mut handles: Vec<AgentHandle> = Vec::new();
    for (actuator, link) in actuators.into_iter().zip(links) {
        let id = actuator.id().clone();
        let mut agent = Agent::new(id.clone(), config.clone(), Arc::new(actuator));
        let mut inbox = None;
        if let Some((peer, link, peer_inbox)) = link {
            agent = agent.with_peer(&peer, Arc::new(link));
            inbox = Some(peer_inbox);
        }
        let (tx, rx) = mpsc::channel(config.sense_buffer);
        background.push(sim.spawn_sensor(id, tx, scenario.sense_interval()));
        handles.push(agent.spawn(rx, inbox));
    }

    tracing::info!(agents, seconds = duration.as_secs_f64(), "run started");
    tokio::time::sleep(duration).await;

    for handle in handles {
        handle.stop().await;
    }
    for task in background {
        task.abort();
    }

    summarize(&sim, &ids, duration).await
}

async fn summarize(sim: &LocalSim, ids: &[AgentId], duration: Duration) -> Result<RunSummary> {
    let mut scores = Vec::with_capacity(ids.len());
    for id in ids {
        scores.push(AgentScore {
            id: id.clone(),
            score: sim.score_of(id).await.unwrap_or(0),
        });
    }
    Ok(RunSummary {
        seconds: duration.as_secs_f64(),
        scores,
        items_left: sim.item_count().await,
    })
}
