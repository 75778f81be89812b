use std::sync::Arc;
use std::time::Duration;

use courier_belief::World;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::Actuator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanLimits {
    /// How many times a blocked walk may re-route after a probe moved us.
    pub max_probe_rounds: u32,

    /// Exploration candidates visited more recently than this are skipped.
    #[serde(with = "millis", rename = "candidate_revisit_ms")]
    pub candidate_revisit: Duration,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_probe_rounds: 3,
            candidate_revisit: Duration::from_secs(10),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Shared handles a plan needs. Locks on `world` are never held across an actuator call.
#[derive(Clone)]
pub struct PlanContext {
    pub world: Arc<Mutex<World>>,
    pub actuator: Arc<dyn Actuator>,
    pub limits: PlanLimits,
}

impl PlanContext {
    pub fn new(world: Arc<Mutex<World>>, actuator: Arc<dyn Actuator>) -> Self {
        Self {
            world,
            actuator,
            limits: PlanLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: PlanLimits) -> Self {
        self.limits = limits;
        self
    }
}
