// src/condition.rs
//
// Step predicates: stop conditions for `Solver::solve` and attachment conditions for
// step handlers.

use std::fmt;
use std::sync::Arc;

use crate::state::SimulationState;

pub type Predicate = Arc<dyn Fn(&SimulationState) -> bool + Send + Sync>;

#[derive(Clone)]
pub enum Condition {
    Always,
    Never,
    /// True on steps 0, n, 2n, ...
    EveryNthStep(usize),
    /// True once the simulated time reaches `t_end` (s).
    Time(f64),
    /// True once `step` reaches the given count.
    StepCount(usize),
    /// True once the last measured integration step turned m by less than `max_deg_per_ns`.
    /// Any replacement of m outside a measured step resets the rate to infinity.
    Relaxed { max_deg_per_ns: f64 },
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Custom(Predicate),
}

impl Condition {
    pub fn relaxed(max_deg_per_ns: f64) -> Self {
        Condition::Relaxed { max_deg_per_ns }
    }

    pub fn custom<P>(p: P) -> Self
    where
        P: Fn(&SimulationState) -> bool + Send + Sync + 'static,
    {
        Condition::Custom(Arc::new(p))
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    pub fn check(&self, state: &SimulationState) -> bool {
        match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::EveryNthStep(n) => *n > 0 && state.step % n == 0,
            Condition::Time(t_end) => state.t >= *t_end,
            Condition::StepCount(n) => state.step >= *n,
            // step 0 has no previous step to measure against
            Condition::Relaxed { max_deg_per_ns } => {
                state.step > 0 && state.deg_per_ns < *max_deg_per_ns
            }
            Condition::Not(c) => !c.check(state),
            Condition::And(a, b) => a.check(state) && b.check(state),
            Condition::Or(a, b) => a.check(state) || b.check(state),
            Condition::Custom(p) => p(state),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => write!(f, "Always"),
            Condition::Never => write!(f, "Never"),
            Condition::EveryNthStep(n) => write!(f, "EveryNthStep({})", n),
            Condition::Time(t) => write!(f, "Time({:e})", t),
            Condition::StepCount(n) => write!(f, "StepCount({})", n),
            Condition::Relaxed { max_deg_per_ns } => write!(f, "Relaxed({})", max_deg_per_ns),
            Condition::Not(c) => write!(f, "Not({:?})", c),
            Condition::And(a, b) => write!(f, "And({:?}, {:?})", a, b),
            Condition::Or(a, b) => write!(f, "Or({:?}, {:?})", a, b),
            Condition::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid2D;
    use crate::vector_field::VectorField2D;

    fn state() -> SimulationState {
        SimulationState::new(VectorField2D::new(Grid2D::new(1, 1, 1.0, 1.0, 1.0)), 1e-13)
    }

    #[test]
    fn every_nth_step_fires_on_multiples_only() {
        let mut s = state();
        let c = Condition::EveryNthStep(100);
        let fired: Vec<usize> = (0..=300)
            .filter(|&k| {
                s.step = k;
                c.check(&s)
            })
            .collect();
        assert_eq!(fired, vec![0, 100, 200, 300]);
        assert!(!Condition::EveryNthStep(0).check(&s));
    }

    #[test]
    fn relaxed_needs_at_least_one_step() {
        let mut s = state();
        let c = Condition::relaxed(1.0);
        s.deg_per_ns = 0.0;
        assert!(!c.check(&s));
        s.step = 1;
        assert!(c.check(&s));
        s.deg_per_ns = 2.0;
        assert!(!c.check(&s));
    }

    #[test]
    fn combinators_and_custom() {
        let mut s = state();
        s.t = 2e-9;
        s.step = 5;
        let c = Condition::Time(1e-9).and(Condition::custom(|st| st.step == 5));
        assert!(c.check(&s));
        let c = Condition::Never.or(Condition::Not(Box::new(Condition::StepCount(10))));
        assert!(c.check(&s));
        assert_eq!(format!("{:?}", Condition::custom(|_| true)), "Custom(..)");
    }
}
