use courier_core::{Cell, TileMap};

/// Spawner hot-spots used to steer idle exploration.
///
/// Each spawner tile is ranked by how many spawner tiles lie within `radius` (Manhattan). Cells
/// are then taken greedily in rank order, keeping only those at least `2 * radius` away from every
/// cell already taken, up to `max` cells. Ties keep tile order, so the result is reproducible.
pub fn candidate_cells(map: &TileMap, radius: u32, max: usize) -> Vec<Cell> {
    let spawners = map.spawner_cells();
    let mut ranked: Vec<(usize, Cell)> = spawners
        .iter()
        .map(|&c| {
            let density = spawners.iter().filter(|&&o| c.manhattan(o) <= radius).count();
            (density, c)
        })
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    let separation = radius.saturating_mul(2).max(1);
    let mut picked: Vec<Cell> = Vec::new();
    for (_, cell) in ranked {
        if picked.len() >= max {
            break;
        }
        if picked.iter().all(|p| p.manhattan(cell) >= separation) {
            picked.push(cell);
        }
    }
    picked
}
