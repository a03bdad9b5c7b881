//! Spatial hash grid for vertex proximity queries.
//!
//! Provides O(1) cell lookup and O(K) neighbour queries where K is the average
//! number of vertices per cell, replacing the O(N²) all-pairs scan a naive weld
//! would need.
//!
//! ## Cell Size Choice
//!
//! The cell size must be at least the query radius so a query only ever needs
//! the 3×3×3 block around the query cell.  [`VertexGrid::new`] takes the weld
//! tolerance and uses it directly as the cell size.

use bevy::math::Vec3;
use std::collections::HashMap;

/// Hash grid mapping integer cell coordinates to vertex indices.
#[derive(Debug, Clone, Default)]
pub struct VertexGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32, i32), Vec<u32>>,
}

impl VertexGrid {
    /// Create an empty grid.  `cell_size` must be strictly positive.
    pub fn new(cell_size: f32) -> Self {
        debug_assert!(cell_size > 0.0, "cell size must be positive");
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// Compute grid cell coordinates for a position
    fn cell_of(&self, pos: Vec3) -> (i32, i32, i32) {
        let inv = 1.0 / self.cell_size;
        (
            (pos.x * inv).floor() as i32,
            (pos.y * inv).floor() as i32,
            (pos.z * inv).floor() as i32,
        )
    }

    /// Insert a vertex index at a position.
    pub fn insert(&mut self, index: u32, pos: Vec3) {
        let cell = self.cell_of(pos);
        self.cells.entry(cell).or_default().push(index);
    }

    /// Visit every index stored in the 27 cells around `pos`.
    ///
    /// Note: results include vertices farther than one cell away from `pos`;
    /// callers must do the exact distance check themselves (the grid is a
    /// conservative over-approximation).
    pub fn for_each_near(&self, pos: Vec3, mut visit: impl FnMut(u32)) {
        let (cx, cy, cz) = self.cell_of(pos);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(indices) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                        indices.iter().copied().for_each(&mut visit);
                    }
                }
            }
        }
    }

    /// First stored index (in insertion order within each cell) whose position
    /// lies within `radius` of `pos`.
    pub fn find_within(&self, positions: &[Vec3], pos: Vec3, radius: f32) -> Option<u32> {
        let mut best: Option<u32> = None;
        self.for_each_near(pos, |i| {
            if positions[i as usize].distance(pos) <= radius && best.is_none_or(|b| i < b) {
                best = Some(i);
            }
        });
        best
    }
}
