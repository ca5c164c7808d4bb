// src/error.rs

use thiserror::Error;

use crate::evolver::EvolverKind;

#[derive(Debug, Error)]
pub enum SolverError {
    /// Relaxation requested with a backend that cannot evaluate relax-style stop conditions.
    #[error("the {kind} evolver is not usable to relax a system; use rkf45 instead")]
    IncompatibleEvolver { kind: EvolverKind },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Operator chose "raise user abort" from the interrupt menu.
    #[error("solver aborted by user")]
    UserAbort,

    #[error("field on a {found} grid does not match the state grid {expected}")]
    GridMismatch { expected: String, found: String },

    #[error("could not install the SIGINT handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SolverError>;
