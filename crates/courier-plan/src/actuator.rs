use async_trait::async_trait;
use courier_core::{Direction, ItemId, Position};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActError {
    #[error("actuator disconnected")]
    Disconnected,

    #[error("action rejected: {0}")]
    Rejected(String),
}

/// Primitive moves offered by the sense/act layer.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Move one cell. `Ok(None)` means the move was refused and the agent did not move.
    async fn step(&self, direction: Direction) -> Result<Option<Position>, ActError>;

    /// Pick up whatever lies on the current cell.
    async fn pick_up(&self) -> Result<Vec<ItemId>, ActError>;

    /// Put down everything carried.
    async fn put_down(&self) -> Result<Vec<ItemId>, ActError>;
}
