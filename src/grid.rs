// src/grid.rs

use serde::{Deserialize, Serialize};

/// Simple 2D finite-difference grid (one cell thick, thickness `dz`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid2D {
    pub nx: usize,
    pub ny: usize,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Grid2D {
    /// Create a new 2D grid with nx × ny cells and spacings dx, dy, dz.
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64, dz: f64) -> Self {
        Self { nx, ny, dx, dy, dz }
    }

    /// Total number of cells.
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny
    }

    /// Convert (i, j) indices to a flat index into a 1D array.
    #[inline]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny);
        j * self.nx + i
    }
}

impl std::fmt::Display for Grid2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RectangularMesh(({}, {}, 1), ({:e}, {:e}, {:e}))",
            self.nx, self.ny, self.dx, self.dy, self.dz
        )
    }
}
