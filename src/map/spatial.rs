use std::collections::HashMap;

use glam::DVec2;

/// Spatial hash grid over canvas positions for pointer hit testing
pub struct SpatialGrid<T> {
    /// Grid cells indexed by (cell_x, cell_y)
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// All items with their positions (indices into this vec stored in cells)
    items: Vec<(DVec2, T)>,
    /// Cell size in canvas units
    cell_size: f64,
}

impl<T> SpatialGrid<T> {
    /// Create a new spatial grid with given cell size in canvas units
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            items: Vec::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, p: DVec2) -> (i32, i32) {
        let x = (p.x / self.cell_size).floor() as i32;
        let y = (p.y / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Insert an item at a position
    pub fn insert(&mut self, position: DVec2, item: T) {
        let idx = self.items.len();
        self.items.push((position, item));

        let cell = self.to_cell(position);
        self.cells.entry(cell).or_default().push(idx);
    }

    /// Indices of items in the cells overlapping a circle. May include items
    /// slightly outside the radius; callers do the exact distance check.
    pub fn query_radius(&self, center: DVec2, radius: f64) -> Vec<usize> {
        let min_cell = self.to_cell(center - DVec2::splat(radius));
        let max_cell = self.to_cell(center + DVec2::splat(radius));

        let mut results = Vec::new();
        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }

        results
    }

    /// Get item and its position by index
    #[inline(always)]
    pub fn get(&self, idx: usize) -> Option<&(DVec2, T)> {
        self.items.get(idx)
    }
}
