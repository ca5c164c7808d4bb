// src/params.rs

use serde::{Deserialize, Serialize};

/// Electron gyromagnetic ratio (rad s^-1 T^-1).
pub const GAMMA_E: f64 = 1.760_859_630_23e11;

/// Parameters for the LLG equation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LLGParams {
    pub gamma: f64, // gyromagnetic ratio (rad/(s*T))
    pub alpha: f64, // damping constant
    pub dt: f64,    // time step (s)
}

impl Default for LLGParams {
    fn default() -> Self {
        Self {
            gamma: GAMMA_E,
            alpha: 0.5,
            dt: 1e-13,
        }
    }
}

/// Material constants needed by the local field terms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub ms: f64,  // saturation magnetisation (A/m)
    pub k_u: f64, // uniaxial anisotropy (J/m^3)
    pub easy_axis: [f64; 3],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ms: 8.0e5,
            k_u: 0.0,
            easy_axis: [0.0, 0.0, 1.0],
        }
    }
}
