// src/llg.rs
//
// Explicit Euler LLG stepper (fixed dt). Cheap reference backend for relax/solve runs.

use crate::error::Result;
use crate::evolver::{Evolver, EvolverKind};
use crate::model::EffectiveField;
use crate::params::LLGParams;
use crate::state::SimulationState;
use crate::vec3::cross;
use crate::vector_field::VectorField2D;

/// LLG RHS in Landau–Lifshitz form:
/// dm/dt = -gamma/(1+alpha^2) [ m × B + alpha m × (m × B) ]
#[inline]
pub fn llg_rhs(m: [f64; 3], b: [f64; 3], gamma: f64, alpha: f64) -> [f64; 3] {
    let pref = -gamma / (1.0 + alpha * alpha);
    let m_cross_b = cross(m, b);
    let m_cross_m_cross_b = cross(m, m_cross_b);
    [
        pref * (m_cross_b[0] + alpha * m_cross_m_cross_b[0]),
        pref * (m_cross_b[1] + alpha * m_cross_m_cross_b[1]),
        pref * (m_cross_b[2] + alpha * m_cross_m_cross_b[2]),
    ]
}

pub struct EulerEvolver<F> {
    pub field: F,
    pub params: LLGParams,
    b_eff: Option<VectorField2D>,
}

impl<F: EffectiveField> EulerEvolver<F> {
    pub fn new(field: F, params: LLGParams) -> Self {
        Self {
            field,
            params,
            b_eff: None,
        }
    }
}

impl<F: EffectiveField> Evolver for EulerEvolver<F> {
    fn kind(&self) -> EvolverKind {
        EvolverKind::Euler
    }

    fn evolve(&mut self, state: &mut SimulationState) -> Result<f64> {
        let dt = self.params.dt;
        let grid = *state.grid();

        let b_eff = self.b_eff.get_or_insert_with(|| VectorField2D::zeros(grid));
        if b_eff.grid != grid {
            *b_eff = VectorField2D::zeros(grid);
        }
        self.field.build(state.m(), b_eff);

        let mut next = state.m().clone();
        for (cell, b) in next.data.iter_mut().zip(b_eff.data.iter()) {
            let dmdt = llg_rhs(*cell, *b, self.params.gamma, self.params.alpha);
            cell[0] += dt * dmdt[0];
            cell[1] += dt * dmdt[1];
            cell[2] += dt * dmdt[2];
        }

        state.set_m(next)?;
        state.t += dt;
        state.h = dt;
        Ok(dt)
    }
}
