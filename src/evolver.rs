// src/evolver.rs
//
// Time-integration backends, as seen by the solver.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::SimulationState;

/// Closed set of backend identities, resolved when the solver is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvolverKind {
    Euler,
    Rk23,
    Rkf45,
    /// Implicit multistep backend; has no notion of a relax stopping condition.
    Cvode,
}

impl EvolverKind {
    pub fn supports_relax(self) -> bool {
        self != EvolverKind::Cvode
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Euler => "euler",
            Self::Rk23 => "rk23",
            Self::Rkf45 => "rkf45",
            Self::Cvode => "cvode",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "euler" => Some(Self::Euler),
            "rk23" => Some(Self::Rk23),
            "rkf45" | "rk45" => Some(Self::Rkf45),
            "cvode" => Some(Self::Cvode),
            _ => None,
        }
    }
}

impl fmt::Display for EvolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Evolver {
    fn kind(&self) -> EvolverKind;

    /// Advance `state` by one step: write the new m (via `set_m`) and advance `t`.
    /// May update `state.h` with the next suggested step. Returns the step actually taken.
    ///
    /// The solver runs `finish_step`/`flush_cache` and bumps `step` afterwards.
    fn evolve(&mut self, state: &mut SimulationState) -> Result<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cvode_refuses_relax() {
        for k in [EvolverKind::Euler, EvolverKind::Rk23, EvolverKind::Rkf45] {
            assert!(k.supports_relax(), "{} should support relax", k);
        }
        assert!(!EvolverKind::Cvode.supports_relax());
    }

    #[test]
    fn names_round_trip() {
        for k in [
            EvolverKind::Euler,
            EvolverKind::Rk23,
            EvolverKind::Rkf45,
            EvolverKind::Cvode,
        ] {
            assert_eq!(EvolverKind::from_str(k.as_str()), Some(k));
        }
        assert_eq!(EvolverKind::from_str("rk45"), Some(EvolverKind::Rkf45));
        assert_eq!(EvolverKind::from_str("heun"), None);
    }
}
