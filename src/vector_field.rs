// src/vector_field.rs

use rayon::prelude::*;

use crate::grid::Grid2D;
use crate::vec3::{dot, norm, normalize, sub};

/// Fields with at least this many cells use the Rayon path for reductions.
const PAR_CELLS: usize = 16_384;
const CHUNK: usize = 2048;

/// Magnetisation-like field defined on a 2D grid.
/// Each cell stores (mx, my, mz).
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField2D {
    pub grid: Grid2D,
    pub data: Vec<[f64; 3]>,
}

impl VectorField2D {
    /// Create a new field on the given grid, initialised along +z.
    pub fn new(grid: Grid2D) -> Self {
        let n = grid.n_cells();
        Self {
            grid,
            data: vec![[0.0, 0.0, 1.0]; n],
        }
    }

    /// A field with every cell set to zero.
    pub fn zeros(grid: Grid2D) -> Self {
        let n = grid.n_cells();
        Self {
            grid,
            data: vec![[0.0; 3]; n],
        }
    }

    /// Set all cells to the same value (mx, my, mz).
    pub fn set_uniform(&mut self, mx: f64, my: f64, mz: f64) {
        for cell in &mut self.data {
            *cell = [mx, my, mz];
        }
    }

    /// Get the flat index in `data` for grid indices (i, j).
    #[inline]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        self.grid.idx(i, j)
    }

    /// `a - b`, cell by cell.
    pub fn difference(a: &VectorField2D, b: &VectorField2D) -> VectorField2D {
        debug_assert_eq!(a.data.len(), b.data.len());
        let data = a
            .data
            .iter()
            .zip(b.data.iter())
            .map(|(x, y)| sub(*x, *y))
            .collect();
        VectorField2D { grid: a.grid, data }
    }

    /// self += factor * other
    pub fn add_scaled(&mut self, factor: f64, other: &VectorField2D) {
        debug_assert_eq!(self.data.len(), other.data.len());
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            a[0] += factor * b[0];
            a[1] += factor * b[1];
            a[2] += factor * b[2];
        }
    }

    /// Σ_i a_i · b_i over all cells.
    ///
    /// The parallel path sums fixed-size chunks and then adds the partial sums in chunk
    /// order, so the result does not depend on thread scheduling.
    pub fn dot_sum(&self, other: &VectorField2D) -> f64 {
        debug_assert_eq!(self.data.len(), other.data.len());
        if self.data.len() < PAR_CELLS {
            return self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| dot(*a, *b))
                .sum();
        }
        let partial: Vec<f64> = self
            .data
            .par_chunks(CHUNK)
            .zip(other.data.par_chunks(CHUNK))
            .map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| dot(*x, *y)).sum())
            .collect();
        partial.iter().sum()
    }

    /// max_i |v_i|
    pub fn abs_max(&self) -> f64 {
        if self.data.len() < PAR_CELLS {
            return self.data.iter().map(|v| norm(*v)).fold(0.0, f64::max);
        }
        self.data
            .par_iter()
            .map(|v| norm(*v))
            .reduce(|| 0.0, f64::max)
    }

    /// Cell average of each component.
    pub fn average(&self) -> [f64; 3] {
        let n = self.data.len().max(1) as f64;
        let mut acc = [0.0; 3];
        for v in &self.data {
            acc[0] += v[0];
            acc[1] += v[1];
            acc[2] += v[2];
        }
        [acc[0] / n, acc[1] / n, acc[2] / n]
    }

    /// Renormalise every cell to unit length.
    pub fn normalize(&mut self) {
        if self.data.len() < PAR_CELLS {
            for v in &mut self.data {
                *v = normalize(*v);
            }
        } else {
            self.data.par_iter_mut().for_each(|v| *v = normalize(*v));
        }
    }

    /// Initialise a simple 180° Bloch wall along x.
    ///
    /// - `x0`   : wall centre position (same units as `grid.dx`, i.e. metres)
    /// - `width`: characteristic wall width
    ///
    /// m rotates in the x–z plane: mx in-plane, mz out-of-plane.
    pub fn init_bloch_wall(&mut self, x0: f64, width: f64) {
        let nx = self.grid.nx;
        let ny = self.grid.ny;
        let dx = self.grid.dx;

        for j in 0..ny {
            for i in 0..nx {
                let x = (i as f64 + 0.5) * dx;
                let u = (x - x0) / width;

                let mz = u.tanh();
                let mx = 1.0 / u.cosh();

                let idx = self.idx(i, j);
                self.data[idx] = normalize([mx, 0.0, mz]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid2D;

    #[test]
    fn bloch_wall_has_opposite_mz_at_edges_and_unit_norm() {
        let nx = 64;
        let grid = Grid2D::new(nx, 1, 1.0, 1.0, 1.0);
        let mut m = VectorField2D::new(grid);

        let x0 = 0.5 * nx as f64;
        m.init_bloch_wall(x0, 5.0);

        let left_m = m.data[m.idx(0, 0)];
        let right_m = m.data[m.idx(nx - 1, 0)];
        assert!(
            left_m[2] * right_m[2] < 0.0,
            "mz at edges should have opposite sign (left={}, right={})",
            left_m[2],
            right_m[2]
        );

        for &i in &[0usize, nx / 2, nx - 1] {
            let v = m.data[m.idx(i, 0)];
            assert!((norm(v) - 1.0).abs() < 1e-12, "norm at i={} not ~1", i);
        }
    }

    #[test]
    fn reductions_match_hand_values() {
        let grid = Grid2D::new(2, 1, 1.0, 1.0, 1.0);
        let a = VectorField2D {
            grid,
            data: vec![[1.0, 2.0, 2.0], [0.0, 0.0, -1.0]],
        };
        let b = VectorField2D {
            grid,
            data: vec![[1.0, 0.0, 0.0], [0.0, 0.0, 4.0]],
        };
        assert_eq!(a.dot_sum(&b), 1.0 - 4.0);
        assert_eq!(a.abs_max(), 3.0);
        assert_eq!(a.average(), [0.5, 1.0, 0.5]);

        let d = VectorField2D::difference(&a, &b);
        assert_eq!(d.data, vec![[0.0, 2.0, 2.0], [0.0, 0.0, -5.0]]);

        let mut c = a.clone();
        c.add_scaled(-2.0, &b);
        assert_eq!(c.data, vec![[-1.0, 2.0, 2.0], [0.0, 0.0, -9.0]]);
    }

    #[test]
    fn parallel_reductions_agree_with_serial_sums() {
        let grid = Grid2D::new(256, 128, 1.0, 1.0, 1.0);
        let mut a = VectorField2D::new(grid);
        for (k, v) in a.data.iter_mut().enumerate() {
            let s = (k % 7) as f64 - 3.0;
            *v = [s, 0.5, 1.0];
        }
        let serial: f64 = a.data.iter().map(|v| dot(*v, *v)).sum();
        let par = a.dot_sum(&a);
        assert!((serial - par).abs() <= 1e-9 * serial.abs());
        assert!((a.abs_max() - norm([-3.0, 0.5, 1.0])).abs() < 1e-12);
    }
}
