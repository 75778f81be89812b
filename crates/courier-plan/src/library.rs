use courier_core::CancelToken;
use courier_intent::Goal;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::{plans, PlanContext, PlanError};

/// A strategy body. Borrowed arguments live as long as the returned future.
pub type PlanFn =
    for<'a> fn(&'a PlanContext, &'a Goal, &'a CancelToken) -> BoxFuture<'a, Result<(), PlanError>>;

#[derive(Clone, Copy)]
pub struct PlanEntry {
    pub name: &'static str,
    pub applies: fn(&Goal) -> bool,
    pub run: PlanFn,
}

impl std::fmt::Debug for PlanEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanEntry").field("name", &self.name).finish()
    }
}

/// Ordered strategy table; earlier entries are tried first.
#[derive(Debug, Clone)]
pub struct PlanLibrary {
    entries: Vec<PlanEntry>,
}

impl Default for PlanLibrary {
    fn default() -> Self {
        Self {
            entries: vec![
                PlanEntry {
                    name: "pick_up",
                    applies: |g| matches!(g, Goal::PickUp { .. }),
                    run: plans::pick_up,
                },
                PlanEntry {
                    name: "pick_up_replanned",
                    applies: |g| matches!(g, Goal::PickUp { .. }),
                    run: plans::pick_up_replanned,
                },
                PlanEntry {
                    name: "deliver",
                    applies: |g| matches!(g, Goal::Deliver { .. }),
                    run: plans::deliver,
                },
                PlanEntry {
                    name: "deliver_nearest",
                    applies: |g| matches!(g, Goal::Deliver { .. }),
                    run: plans::deliver_nearest,
                },
                PlanEntry {
                    name: "deliver_to_peer",
                    applies: |g| matches!(g, Goal::DeliverToPeer { .. }),
                    run: plans::deliver_to_peer,
                },
                PlanEntry {
                    name: "idle",
                    applies: |g| matches!(g, Goal::Idle),
                    run: plans::idle,
                },
            ],
        }
    }
}

impl PlanLibrary {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: PlanEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Run applicable entries in order until one succeeds. Returns the winning entry's name.
    ///
    /// `Stopped` ends the attempt at once; any other failure falls through to the next entry and
    /// the last one is reported if every entry fails.
    pub async fn execute(
        &self,
        ctx: &PlanContext,
        goal: &Goal,
        cancel: &CancelToken,
    ) -> Result<&'static str, PlanError> {
        let mut last = None;
        for entry in self.entries.iter().filter(|e| (e.applies)(goal)) {
            if cancel.is_cancelled() {
                return Err(PlanError::Stopped);
            }
            debug!(plan = entry.name, goal = %goal, "running plan");
            match (entry.run)(ctx, goal, cancel).await {
                Ok(()) => return Ok(entry.name),
                Err(PlanError::Stopped) => return Err(PlanError::Stopped),
                Err(err) => {
                    warn!(plan = entry.name, goal = %goal, error = %err, "plan failed");
                    last = Some(err);
                }
            }
        }
        Err(last.unwrap_or(PlanError::NoApplicablePlan))
    }
}
