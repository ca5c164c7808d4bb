// src/lib.rs

pub mod condition;
pub mod config;
pub mod error;
pub mod evolver;
pub mod grid;
pub mod interrupt;
pub mod llg;
pub mod minimize;
pub mod model;
pub mod ovf;
pub mod params;
pub mod solver;
pub mod state;
pub mod stephandler;
pub mod vec3;
pub mod vector_field;

pub use error::{Result, SolverError};
pub use solver::Solver;
