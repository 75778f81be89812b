use courier_core::Cell;
use serde::{Deserialize, Serialize};

/// A shortest path: `cells[0]` is the start, `cells.last()` the destination, `cost` the number
/// of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub cost: u32,
    pub cells: Vec<Cell>,
}

impl Route {
    /// Zero-length route for an agent already standing on its destination.
    pub fn stay(cell: Cell) -> Self {
        Self {
            cost: 0,
            cells: vec![cell],
        }
    }

    pub fn start(&self) -> Option<Cell> {
        self.cells.first().copied()
    }

    pub fn end(&self) -> Option<Cell> {
        self.cells.last().copied()
    }

    /// Consecutive `(from, to)` pairs.
    pub fn steps(&self) -> impl Iterator<Item = (Cell, Cell)> + '_ {
        self.cells.windows(2).map(|w| (w[0], w[1]))
    }
}
