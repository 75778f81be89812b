use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("malformed peer payload: {0}")]
    Malformed(String),

    #[error("peer link failed: {0}")]
    Link(String),

    #[error("no reply within {0:?}")]
    Timeout(Duration),
}
