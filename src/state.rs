// src/state.rs
//
// Mutable simulation record owned by the solver for the duration of a run.
// Observers only ever see `&SimulationState`.

use crate::error::{Result, SolverError};
use crate::grid::Grid2D;
use crate::model::FieldEvolution;
use crate::vector_field::VectorField2D;

pub struct SimulationState {
    m: VectorField2D,
    /// Simulated time (s). Unused by the minimizer.
    pub t: f64,
    /// Current step size (s): last integrator step, or the minimizer's latest estimate.
    pub h: f64,
    pub step: usize,
    /// Angular rate of the last integration step (deg/ns). `f64::INFINITY` until a step
    /// has been measured on the current field.
    pub deg_per_ns: f64,
    /// Convergence metric of the last minimizer iteration (deg/ns).
    pub deg_per_ns_minimizer: f64,
    minimizer_dm: Option<VectorField2D>,
}

impl SimulationState {
    pub fn new(m: VectorField2D, h: f64) -> Self {
        Self {
            m,
            t: 0.0,
            h,
            step: 0,
            deg_per_ns: f64::INFINITY,
            deg_per_ns_minimizer: 0.0,
            minimizer_dm: None,
        }
    }

    pub fn m(&self) -> &VectorField2D {
        &self.m
    }

    pub fn grid(&self) -> &Grid2D {
        &self.m.grid
    }

    /// Replace the field. Callers must follow up with `finish_step` and `flush_cache`.
    ///
    /// Invalidates `deg_per_ns`; the integrator loop measures it again after committing.
    pub fn set_m(&mut self, m: VectorField2D) -> Result<()> {
        if m.grid != self.m.grid || m.data.len() != self.m.data.len() {
            return Err(SolverError::GridMismatch {
                expected: self.m.grid.to_string(),
                found: m.grid.to_string(),
            });
        }
        self.m = m;
        self.deg_per_ns = f64::INFINITY;
        Ok(())
    }

    /// Post-update hook: renormalise m to unit length.
    pub fn finish_step(&mut self) {
        self.m.normalize();
    }

    /// Drop every quantity derived from the previous m.
    pub fn flush_cache(&mut self) {
        self.minimizer_dm = None;
    }

    /// Minimizer derivative at the current m, computed on first use after a flush.
    pub fn minimizer_dm(&mut self, model: &dyn FieldEvolution) -> &VectorField2D {
        let m = &self.m;
        self.minimizer_dm.get_or_insert_with(|| model.minimizer_dm(m))
    }

    /// Candidate next field for step size `h`, together with the derivative it was built from.
    pub fn minimizer_m(
        &mut self,
        model: &dyn FieldEvolution,
        h: f64,
    ) -> (VectorField2D, VectorField2D) {
        let dm = self.minimizer_dm(model).clone();
        let next = model.minimizer_m(&self.m, &dm, h);
        (next, dm)
    }
}

/// Angular change rate in degrees per nanosecond.
///
/// `max_dm` is max_i |m_new - m_old|, `max_m` is max_i |m_new|, `dt` the step (s).
pub fn deg_per_ns(max_dm: f64, max_m: f64, dt: f64) -> f64 {
    let deg = max_dm.atan2(max_m).to_degrees();
    (deg / dt).abs() * 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deg_per_ns_of_a_one_degree_turn_per_ns() {
        let rad = 1.0_f64.to_radians();
        let v = deg_per_ns(rad.tan(), 1.0, 1e-9);
        assert!((v - 1.0).abs() < 1e-12, "got {}", v);
        // Sign of dt does not matter.
        assert!((deg_per_ns(rad.tan(), 1.0, -1e-9) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn set_m_rejects_a_field_on_another_grid() {
        let g = Grid2D::new(2, 2, 1.0, 1.0, 1.0);
        let mut s = SimulationState::new(VectorField2D::new(g), 1e-13);
        let other = VectorField2D::new(Grid2D::new(3, 1, 1.0, 1.0, 1.0));
        assert!(matches!(
            s.set_m(other),
            Err(SolverError::GridMismatch { .. })
        ));
        assert_eq!(s.m().data.len(), 4);
    }

    #[test]
    fn finish_step_renormalises() {
        let g = Grid2D::new(1, 1, 1.0, 1.0, 1.0);
        let mut f = VectorField2D::new(g);
        f.set_uniform(0.0, 3.0, 4.0);
        let mut s = SimulationState::new(VectorField2D::new(g), 1e-13);
        s.set_m(f).unwrap();
        s.finish_step();
        let v = s.m().data[0];
        assert!((v[1] - 0.6).abs() < 1e-15 && (v[2] - 0.8).abs() < 1e-15);
    }

    #[test]
    fn replacing_m_forgets_the_measured_rate() {
        let g = Grid2D::new(1, 1, 1.0, 1.0, 1.0);
        let mut s = SimulationState::new(VectorField2D::new(g), 1e-13);
        assert_eq!(s.deg_per_ns, f64::INFINITY);

        s.deg_per_ns = 1e-3;
        s.set_m(VectorField2D::new(g)).unwrap();
        assert_eq!(s.deg_per_ns, f64::INFINITY);
    }
}
