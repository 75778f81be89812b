use courier_core::{AgentId, Cell, Direction, Position, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    /// Not sensed, but its last cell is beyond sensing range; the cells stay reserved.
    OutOfRange,
    /// Confirmed absent from its last cell; nothing reserved.
    Unknown,
}

impl Visibility {
    /// Whether the agent's cells should be reserved in the graph.
    pub fn reserves_cells(self) -> bool {
        !matches!(self, Visibility::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentBelief {
    pub id: AgentId,
    pub position: Position,
    pub updated_at: Timestamp,
    pub direction: Option<Direction>,
    pub cells: Vec<Cell>,
    pub visibility: Visibility,
    #[serde(default)]
    pub score: i64,
}

impl AgentBelief {
    pub fn last_cell(&self) -> Cell {
        self.position.nearest_cell()
    }

    pub fn in_transit(&self) -> bool {
        !self.position.is_settled()
    }
}

/// Movement direction implied by going from `prev` to `next`.
pub(crate) fn heading(prev: Position, next: Position) -> Option<Direction> {
    let dx = next.x - prev.x;
    let dy = next.y - prev.y;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    if dx.abs() >= dy.abs() {
        Some(if dx > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        })
    } else {
        Some(if dy > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        })
    }
}
