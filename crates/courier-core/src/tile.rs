use serde::{Deserialize, Serialize};

use crate::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    Blocked,
    Walkable,
    Delivery,
    /// Walkable tile where new items may appear.
    Spawner,
}

impl TileKind {
    /// Decode the numeric tile codes used by the game server (0 wall, 1 spawner, 2 delivery,
    /// 3 plain floor).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Blocked),
            1 => Some(Self::Spawner),
            2 => Some(Self::Delivery),
            3 => Some(Self::Walkable),
            _ => None,
        }
    }

    pub fn is_traversable(self) -> bool {
        !matches!(self, TileKind::Blocked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub kind: TileKind,
}

impl Tile {
    pub fn cell(&self) -> Cell {
        Cell::new(self.x, self.y)
    }
}

/// Dense tile grid. Cells never mentioned by the server are blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMap {
    width: u32,
    height: u32,
    kinds: Vec<TileKind>,
}

impl TileMap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            kinds: vec![TileKind::Blocked; (width as usize) * (height as usize)],
        }
    }

    /// Build from the server's flat tile list; tiles outside `width × height` are ignored.
    pub fn from_tiles(width: u32, height: u32, tiles: &[Tile]) -> Self {
        let mut map = Self::new(width, height);
        for tile in tiles {
            map.set(tile.cell(), tile.kind);
        }
        map
    }

    /// Parse rows of characters, top row first: `#` blocked, `.` walkable, `D` delivery,
    /// `S` spawner. Row `0` of the text is the highest `y`.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        let mut map = Self::new(width, height);
        for (row_idx, row) in rows.iter().enumerate() {
            let y = (height as i32) - 1 - row_idx as i32;
            for (x, ch) in row.chars().enumerate() {
                let kind = match ch {
                    '.' => TileKind::Walkable,
                    'D' | 'd' => TileKind::Delivery,
                    'S' | 's' => TileKind::Spawner,
                    _ => TileKind::Blocked,
                };
                map.set(Cell::new(x as i32, y), kind);
            }
        }
        map
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    pub fn index(&self, cell: Cell) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }
        Some((cell.y as usize) * (self.width as usize) + cell.x as usize)
    }

    pub fn cell_at(&self, index: usize) -> Cell {
        let w = self.width.max(1) as usize;
        Cell::new((index % w) as i32, (index / w) as i32)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn set(&mut self, cell: Cell, kind: TileKind) {
        if let Some(idx) = self.index(cell) {
            self.kinds[idx] = kind;
        }
    }

    pub fn kind(&self, cell: Cell) -> TileKind {
        self.index(cell)
            .map(|idx| self.kinds[idx])
            .unwrap_or(TileKind::Blocked)
    }

    pub fn is_traversable(&self, cell: Cell) -> bool {
        self.kind(cell).is_traversable()
    }

    pub fn cells_of(&self, kind: TileKind) -> impl Iterator<Item = Cell> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .filter(move |(_, k)| **k == kind)
            .map(|(idx, _)| self.cell_at(idx))
    }

    pub fn delivery_cells(&self) -> Vec<Cell> {
        self.cells_of(TileKind::Delivery).collect()
    }

    pub fn spawner_cells(&self) -> Vec<Cell> {
        self.cells_of(TileKind::Spawner).collect()
    }
}
