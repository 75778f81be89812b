use serde::{Deserialize, Serialize};

/// Integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Cell {
        let (dx, dy) = dir.delta();
        Cell::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbours in `Direction::ALL` order.
    pub fn neighbors(self) -> [Cell; 4] {
        Direction::ALL.map(|d| self.step(d))
    }

    pub fn manhattan(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Direction of a single step from `self` to `other`, if they are 4-adjacent.
    pub fn direction_to(self, other: Cell) -> Option<Direction> {
        Direction::ALL.into_iter().find(|d| self.step(*d) == other)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Fixed order for reproducible probing and neighbour iteration.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// `Up` grows `y`, `Right` grows `x`.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Continuous position as reported by the server.
///
/// An agent between two cells is reported with one fractional coordinate, e.g. `(3.4, 7.0)`
/// while moving from `(3, 7)` to `(4, 7)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn is_settled(self) -> bool {
        self.x.fract() == 0.0 && self.y.fract() == 0.0
    }

    pub fn nearest_cell(self) -> Cell {
        Cell::new(self.x.round() as i32, self.y.round() as i32)
    }

    /// Cells physically occupied: one when settled, the two straddled cells when in transit.
    pub fn occupied_cells(self) -> Vec<Cell> {
        if !self.is_finite() {
            return Vec::new();
        }
        let low = Cell::new(self.x.floor() as i32, self.y.floor() as i32);
        let high = Cell::new(self.x.ceil() as i32, self.y.ceil() as i32);
        if low == high {
            vec![low]
        } else {
            vec![low, high]
        }
    }
}

impl From<Cell> for Position {
    fn from(cell: Cell) -> Self {
        Position::new(cell.x as f64, cell.y as f64)
    }
}
