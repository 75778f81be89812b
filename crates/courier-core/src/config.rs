//! Simulation parameters delivered by the game server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// How often an unclaimed item loses one unit of reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "String")]
pub enum DecayInterval {
    Every(Duration),
    Never,
}

impl DecayInterval {
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            DecayInterval::Every(d) => Some(d),
            DecayInterval::Never => None,
        }
    }

    /// Number of whole intervals contained in `elapsed`.
    pub fn intervals_in(self, elapsed: Duration) -> u64 {
        match self {
            DecayInterval::Every(d) if !d.is_zero() => (elapsed.as_millis() / d.as_millis()) as u64,
            _ => 0,
        }
    }

    /// Fractional decay units accrued over `elapsed`; used for projections, not bookkeeping.
    pub fn rate_over(self, elapsed: Duration) -> f64 {
        match self {
            DecayInterval::Every(d) if !d.is_zero() => elapsed.as_secs_f64() / d.as_secs_f64(),
            _ => 0.0,
        }
    }
}

impl Default for DecayInterval {
    fn default() -> Self {
        DecayInterval::Every(Duration::from_secs(1))
    }
}

impl From<DecayInterval> for String {
    fn from(value: DecayInterval) -> Self {
        match value {
            DecayInterval::Never => "infinite".to_string(),
            DecayInterval::Every(d) if d.subsec_millis() == 0 => format!("{}s", d.as_secs()),
            DecayInterval::Every(d) => format!("{}ms", d.as_millis()),
        }
    }
}

impl TryFrom<serde_json::Value> for DecayInterval {
    type Error = ConfigError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::String(s) => parse_decay_interval(&s),
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(secs) if secs > 0 => Ok(DecayInterval::Every(Duration::from_secs(secs))),
                _ => Err(ConfigError::InvalidDuration(n.to_string())),
            },
            other => Err(ConfigError::InvalidDuration(other.to_string())),
        }
    }
}

/// Parse `"<N>s"`, `"<N>ms"`, a bare integer number of seconds, or `"infinite"`.
pub fn parse_decay_interval(raw: &str) -> Result<DecayInterval, ConfigError> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("infinite") {
        return Ok(DecayInterval::Never);
    }

    let invalid = || ConfigError::InvalidDuration(raw.to_string());
    let (digits, to_duration): (&str, fn(u64) -> Duration) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, Duration::from_secs)
    } else {
        (s, Duration::from_secs)
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let n: u64 = digits.parse().map_err(|_| invalid())?;
    if n == 0 {
        return Err(invalid());
    }
    Ok(DecayInterval::Every(to_duration(n)))
}

/// Game parameters, accepting both our snake_case names and the server's upper-case keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Items strictly closer than this (Manhattan) are visible.
    #[serde(alias = "PARCELS_OBSERVATION_DISTANCE")]
    pub item_observation_radius: u32,

    /// Agents strictly closer than this (Manhattan) are visible.
    #[serde(alias = "AGENTS_OBSERVATION_DISTANCE")]
    pub agent_observation_radius: u32,

    #[serde(alias = "PARCEL_DECADING_INTERVAL")]
    pub decay_interval: DecayInterval,

    /// Wall-clock duration of one move, in milliseconds.
    #[serde(alias = "MOVEMENT_DURATION")]
    pub movement_duration_ms: u64,

    #[serde(alias = "MOVEMENT_STEPS")]
    pub movement_steps: u32,

    #[serde(alias = "PARCELS_MAX")]
    pub max_carried: usize,

    /// Items whose reward reaches this value are gone.
    pub reward_floor: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            item_observation_radius: 5,
            agent_observation_radius: 5,
            decay_interval: DecayInterval::default(),
            movement_duration_ms: 500,
            movement_steps: 1,
            max_carried: usize::MAX,
            reward_floor: 0,
        }
    }
}

impl SimConfig {
    pub fn movement_duration(&self) -> Duration {
        Duration::from_millis(self.movement_duration_ms)
    }

    /// Expected decay units lost per move.
    pub fn decay_per_step(&self) -> f64 {
        self.decay_interval.rate_over(self.movement_duration())
    }

    /// Parse from the server's loosely-typed config payload.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
