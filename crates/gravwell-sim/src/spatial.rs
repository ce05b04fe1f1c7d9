//! Uniform grid for broad-phase neighbor queries.
//!
//! Rebuilt from scratch every tick. `query` returns everything in the 3x3
//! block of cells around a point; callers do the exact distance checks.

use std::collections::HashMap;

use glam::DVec2;
use hecs::Entity;

use gravwell_core::constants::GRID_CELL_SIZE;
use gravwell_core::types::EntityId;

/// Entry in a grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridEntry {
    pub id: EntityId,
    pub entity: Entity,
    pub pos: DVec2,
}

#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: HashMap<(i32, i32), Vec<GridEntry>>,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(GRID_CELL_SIZE)
    }
}

impl SpatialGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    #[inline]
    pub fn cell_of(&self, pos: DVec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Drop all buckets.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, id: EntityId, entity: Entity, pos: DVec2) {
        let cell = self.cell_of(pos);
        self.cells
            .entry(cell)
            .or_default()
            .push(GridEntry { id, entity, pos });
    }

    /// Everything filed in the cell of `pos` and its eight neighbours.
    pub fn query(&self, pos: DVec2) -> Vec<GridEntry> {
        self.query_cells(pos, 1)
    }

    /// Entries within `radius` of `pos`, closest first.
    pub fn query_radius(&self, pos: DVec2, radius: f64) -> Vec<GridEntry> {
        let reach = (radius / self.cell_size).ceil() as i32;
        let radius_sq = radius * radius;
        let mut found: Vec<GridEntry> = self
            .query_cells(pos, reach.max(1))
            .into_iter()
            .filter(|e| e.pos.distance_squared(pos) <= radius_sq)
            .collect();
        found.sort_by(|a, b| {
            a.pos
                .distance_squared(pos)
                .total_cmp(&b.pos.distance_squared(pos))
                .then(a.id.cmp(&b.id))
        });
        found
    }

    fn query_cells(&self, pos: DVec2, reach: i32) -> Vec<GridEntry> {
        let (cx, cy) = self.cell_of(pos);
        let mut found = Vec::new();
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                if let Some(entries) = self.cells.get(&(cx + dx, cy + dy)) {
                    found.extend_from_slice(entries);
                }
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(Vec::is_empty)
    }
}
