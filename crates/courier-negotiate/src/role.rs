use courier_core::AgentId;
use serde::{Deserialize, Serialize};

use crate::Answer;

/// Which side of a conflict query an agent is on. Only the secondary asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Secondary,
}

/// `configured` wins; otherwise the lexicographically greater id is secondary.
pub fn role_for(me: &AgentId, peer: &AgentId, configured: Option<Role>) -> Role {
    match configured {
        Some(role) => role,
        None if me.as_str() > peer.as_str() => Role::Secondary,
        None => Role::Primary,
    }
}

/// The primary's answer to "may I pick this up, I value it at `asker`?".
///
/// `own` is the primary's score for its highest ranked pickup of the same item, if any.
pub fn answer_conflict(asker: f64, own: Option<f64>, deny_uncontested: bool) -> Answer {
    match own {
        Some(own) if asker > own => Answer::Yes,
        Some(_) => Answer::No,
        None if deny_uncontested => Answer::No,
        None => Answer::Yes,
    }
}
