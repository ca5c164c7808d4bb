// src/model.rs
//
// Field-evolution capability consumed by the minimizer and the Euler evolver.
//
// NOTE: the effective induction B_eff is in Tesla throughout.

use crate::params::Material;
use crate::vec3::{cross, dot};
use crate::vector_field::VectorField2D;

/// Anything that can build B_eff(m).
pub trait EffectiveField {
    fn build(&self, m: &VectorField2D, b_eff: &mut VectorField2D);
}

/// Direct-minimization capability: a descent direction and a trial update.
pub trait FieldEvolution {
    /// dM evaluated at `m`.
    fn minimizer_dm(&self, m: &VectorField2D) -> VectorField2D;

    /// Trial field for step size `h`: m - h * dm.
    fn minimizer_m(&self, m: &VectorField2D, dm: &VectorField2D, h: f64) -> VectorField2D {
        let mut next = m.clone();
        next.add_scaled(-h, dm);
        next
    }
}

/// Zeeman + uniaxial anisotropy. Purely local, so one cell is a macrospin.
#[derive(Debug, Clone, Copy)]
pub struct LocalField {
    pub b_ext: [f64; 3],
    pub material: Material,
}

impl EffectiveField for LocalField {
    fn build(&self, m: &VectorField2D, b_eff: &mut VectorField2D) {
        // Zeeman
        b_eff.set_uniform(self.b_ext[0], self.b_ext[1], self.b_ext[2]);

        // B_ani = (2 K_u / M_s) (m·u) u
        let k_u = self.material.k_u;
        let ms = self.material.ms;
        if k_u == 0.0 || ms == 0.0 {
            return;
        }
        let coeff = 2.0 * k_u / ms;
        let u = self.material.easy_axis;
        for (m_cell, b_cell) in m.data.iter().zip(b_eff.data.iter_mut()) {
            let mdotu = dot(*m_cell, u);
            b_cell[0] += coeff * mdotu * u[0];
            b_cell[1] += coeff * mdotu * u[1];
            b_cell[2] += coeff * mdotu * u[2];
        }
    }
}

/// Damping-only descent: dM = gamma * m × (m × B_eff).
///
/// With this scaling the step size h carries units of seconds, so the deg/ns metric is
/// directly comparable to the one produced by time integration.
pub struct TorqueDescent<F> {
    pub field: F,
    pub gamma: f64,
}

impl<F: EffectiveField> FieldEvolution for TorqueDescent<F> {
    fn minimizer_dm(&self, m: &VectorField2D) -> VectorField2D {
        let mut b_eff = VectorField2D::zeros(m.grid);
        self.field.build(m, &mut b_eff);

        let mut dm = VectorField2D::zeros(m.grid);
        for ((d, mi), bi) in dm.data.iter_mut().zip(m.data.iter()).zip(b_eff.data.iter()) {
            let mxb = cross(*mi, *bi);
            let mxmxb = cross(*mi, mxb);
            *d = [
                self.gamma * mxmxb[0],
                self.gamma * mxmxb[1],
                self.gamma * mxmxb[2],
            ];
        }
        dm
    }
}
