//! Uniform-grid spatial index for minimum-distance queries.

use std::collections::HashMap;

use glam::DVec2;

/// Buckets points into square cells of side `radius`, so every point
/// within `radius` of a query lies in the 3x3 block of cells around it.
#[derive(Debug, Clone)]
pub struct PointGrid {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<DVec2>>,
    len: usize,
}

impl PointGrid {
    /// Creates an empty grid for queries of the given radius.
    ///
    /// Returns `None` unless `radius` is positive and finite.
    pub fn new(radius: f64) -> Option<Self> {
        if !(radius > 0.0 && radius.is_finite()) {
            return None;
        }
        Some(Self {
            cell_size: radius,
            cells: HashMap::new(),
            len: 0,
        })
    }

    /// Cell indices saturate at the `i64` range when the radius is tiny
    /// relative to the coordinates; saturated points share edge cells.
    fn cell_of(&self, p: DVec2) -> (i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }

    pub fn insert(&mut self, p: DVec2) {
        let cell = self.cell_of(p);
        self.cells.entry(cell).or_default().push(p);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if a stored point lies strictly closer than the grid radius.
    pub fn has_neighbor_within(&self, p: DVec2) -> bool {
        let (cx, cy) = self.cell_of(p);
        let r2 = self.cell_size * self.cell_size;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(bucket) = self.cells.get(&(cx.saturating_add(dx), cy.saturating_add(dy))) {
                    if bucket.iter().any(|q| q.distance_squared(p) < r2) {
                        return true;
                    }
                }
            }
        }
        false
    }
}
