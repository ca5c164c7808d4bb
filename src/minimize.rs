// src/minimize.rs
//
// Direct energy minimiser with Barzilai–Borwein step sizes.
//
// Per iteration, with s = M_{k+1} - M_k and y = dM_{k+1} - dM_k:
//   even k: h = (s·s) / (s·y)
//   odd  k: h = (s·y) / (y·y)
// then |h| is clamped to [h_min, h_max] keeping the sign.
//
// Stop: the last `samples` deg/ns values are all <= max_dpns.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::interrupt::Flow;
use crate::model::FieldEvolution;
use crate::state::{SimulationState, deg_per_ns};
use crate::stephandler::{ScreenLogMinimizer, StepHandler};
use crate::vector_field::VectorField2D;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimizeSettings {
    /// Starting step size (s). `None` uses the state's current `h`.
    pub initial_h: Option<f64>,
    /// Convergence threshold on the deg/ns metric.
    pub max_dpns: f64,
    /// Window length for the convergence check.
    pub samples: usize,
    pub h_max: f64,
    pub h_min: f64,
    /// Hard cap on iterations. `None` runs until converged.
    pub max_iters: Option<usize>,
    /// Progress line every N iterations (0 disables).
    pub report_every: usize,
}

impl Default for MinimizeSettings {
    fn default() -> Self {
        Self {
            initial_h: None,
            max_dpns: 0.01,
            samples: 10,
            h_max: 1e-5,
            h_min: 1e-16,
            max_iters: None,
            report_every: 100,
        }
    }
}

impl MinimizeSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.h_min > 0.0 && self.h_min.is_finite()) {
            return Err(SolverError::InvalidSettings(format!(
                "h_min must be positive and finite, got {}",
                self.h_min
            )));
        }
        if !(self.h_max >= self.h_min && self.h_max.is_finite()) {
            return Err(SolverError::InvalidSettings(format!(
                "h_max ({}) must be finite and >= h_min ({})",
                self.h_max, self.h_min
            )));
        }
        if self.samples < 1 {
            return Err(SolverError::InvalidSettings("samples must be >= 1".into()));
        }
        if !(self.max_dpns > 0.0) {
            return Err(SolverError::InvalidSettings(format!(
                "max_dpns must be positive, got {}",
                self.max_dpns
            )));
        }
        if let Some(h) = self.initial_h {
            if !h.is_finite() || h == 0.0 {
                return Err(SolverError::InvalidSettings(format!(
                    "initial_h must be finite and non-zero, got {}",
                    h
                )));
            }
        }
        Ok(())
    }
}

/// The last `capacity` convergence samples, oldest first.
#[derive(Debug, Clone)]
pub struct ConvergenceWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl ConvergenceWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `v`, evicting the oldest sample when full.
    pub fn push(&mut self, v: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(v);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// Full, and every sample <= `max_dpns`.
    pub fn converged(&self, max_dpns: f64) -> bool {
        self.is_full() && self.values.iter().all(|&v| v <= max_dpns)
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }
}

/// sign(h) * clamp(|h|, h_min, h_max)
#[inline]
pub fn clamp_step(h: f64, h_min: f64, h_max: f64) -> f64 {
    h.abs().clamp(h_min, h_max).copysign(h)
}

fn bb_ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let r = num / den;
    r.is_finite().then_some(r)
}

/// Next step size from the alternating BB formulas.
///
/// A zero denominator (or a non-finite ratio) falls back to `h_max` for either formula.
pub fn next_step_size(
    step: usize,
    m_diff: &VectorField2D,
    dm_diff: &VectorField2D,
    h_min: f64,
    h_max: f64,
) -> f64 {
    let (num, den) = if step % 2 == 0 {
        (m_diff.dot_sum(m_diff), m_diff.dot_sum(dm_diff))
    } else {
        (m_diff.dot_sum(dm_diff), dm_diff.dot_sum(dm_diff))
    };
    let h = bb_ratio(num, den).unwrap_or_else(|| {
        tracing::debug!(step, num, den, h_max, "degenerate step-size estimate, using h_max");
        h_max
    });
    clamp_step(h, h_min, h_max)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimizeStop {
    Converged,
    /// `max_iters` reached before convergence.
    MaxIters,
    /// Operator chose "stop" at an interrupt.
    OperatorStop,
}

#[derive(Debug, Clone)]
pub struct MinimizeReport {
    pub iters: usize,
    pub final_h: f64,
    pub deg_per_ns: f64,
    /// Contents of the convergence window on return, oldest first.
    pub window: Vec<f64>,
    pub stop: MinimizeStop,
}

impl MinimizeReport {
    pub fn converged(&self) -> bool {
        self.stop == MinimizeStop::Converged
    }
}

/// Relax `state.m` toward a local energy minimum.
///
/// `boundary` runs before every iteration with the committed state; it is where the
/// solver polls for interrupts. `Flow::Retry` re-enters the boundary without stepping.
pub fn minimize(
    state: &mut SimulationState,
    model: &dyn FieldEvolution,
    settings: &MinimizeSettings,
    boundary: &mut dyn FnMut(&SimulationState) -> Result<Flow>,
) -> Result<MinimizeReport> {
    settings.validate()?;

    let mut h = match settings.initial_h {
        Some(h) => h,
        None if state.h.is_finite() && state.h != 0.0 => state.h,
        None => {
            tracing::warn!(
                state_h = state.h,
                h_max = settings.h_max,
                "unusable state h, starting from h_max"
            );
            settings.h_max
        }
    };
    let mut window = ConvergenceWindow::new(settings.samples);
    let mut progress = ScreenLogMinimizer;

    state.step = 0;
    state.flush_cache();

    tracing::info!(
        h0 = h,
        max_dpns = settings.max_dpns,
        samples = settings.samples,
        "minimize start"
    );

    let stop = loop {
        if window.converged(settings.max_dpns) {
            break MinimizeStop::Converged;
        }
        if let Some(cap) = settings.max_iters {
            if state.step >= cap {
                tracing::warn!(
                    iters = state.step,
                    window_max = window.max().unwrap_or(f64::NAN),
                    "minimize hit max_iters before converging"
                );
                break MinimizeStop::MaxIters;
            }
        }
        match boundary(&*state)? {
            Flow::Proceed => {}
            Flow::Retry => continue,
            Flow::Stop => break MinimizeStop::OperatorStop,
        }

        let (m_next, dm_old) = state.minimizer_m(model, h);
        let m_diff = VectorField2D::difference(&m_next, state.m());

        state.set_m(m_next)?;
        state.finish_step();
        state.flush_cache();

        let dpns = deg_per_ns(m_diff.abs_max(), state.m().abs_max(), h);
        window.push(dpns);
        state.deg_per_ns_minimizer = dpns;

        let dm_diff = VectorField2D::difference(state.minimizer_dm(model), &dm_old);

        h = next_step_size(state.step, &m_diff, &dm_diff, settings.h_min, settings.h_max);
        state.h = h;

        if settings.report_every > 0 && state.step % settings.report_every == 0 {
            progress.handle(&*state);
        }

        state.step += 1;
    };

    tracing::info!(
        iters = state.step,
        deg_per_ns = state.deg_per_ns_minimizer,
        ?stop,
        "minimize finished"
    );

    Ok(MinimizeReport {
        iters: state.step,
        final_h: h,
        deg_per_ns: state.deg_per_ns_minimizer,
        window: window.iter().copied().collect(),
        stop,
    })
}
