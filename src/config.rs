// src/config.rs
//
// Run configuration: loaded from JSON (optional), overridden by `key=value` CLI args,
// and written back next to the outputs as `config.json`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::evolver::EvolverKind;
use crate::grid::Grid2D;
use crate::minimize::MinimizeSettings;
use crate::params::{LLGParams, Material};
use crate::vec3::normalize;
use crate::vector_field::VectorField2D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Minimize,
    Relax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitKind {
    Uniform,
    Tilt,
    Bloch,
}

impl InitKind {
    pub fn from_arg(s: &str) -> Option<Self> {
        match s {
            "uniform" => Some(Self::Uniform),
            "tilt" => Some(Self::Tilt),
            "bloch" => Some(Self::Bloch),
            _ => None,
        }
    }

    pub fn build(&self, grid: Grid2D) -> VectorField2D {
        let mut m = VectorField2D::new(grid);
        match self {
            Self::Uniform => {}
            Self::Tilt => {
                let v = normalize([1.0, 0.0, 1.0]);
                m.set_uniform(v[0], v[1], v[2]);
            }
            Self::Bloch => {
                let x0 = 0.5 * grid.nx as f64 * grid.dx;
                m.init_bloch_wall(x0, 4.0 * grid.dx);
            }
        }
        m
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub geometry: Grid2D,
    pub material: Material,
    /// Uniform applied induction (T).
    pub b_ext: [f64; 3],
    pub llg: LLGParams,
    pub evolver: EvolverKind,
    pub init: InitKind,
    pub mode: RunMode,
    pub minimize: MinimizeSettings,
    /// Relax stop threshold (deg/ns).
    pub relax_max_deg_per_ns: f64,
    /// Console log stride during solve/relax (0 disables).
    pub console_log_every: usize,
    pub out_dir: String,
    pub run_id: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            geometry: Grid2D::new(32, 8, 2e-9, 2e-9, 2e-9),
            material: Material {
                k_u: 5.0e5,
                ..Material::default()
            },
            b_ext: [0.0, 0.0, 0.0],
            llg: LLGParams::default(),
            evolver: EvolverKind::Euler,
            init: InitKind::Tilt,
            mode: RunMode::Minimize,
            minimize: MinimizeSettings::default(),
            relax_max_deg_per_ns: 1.0,
            console_log_every: 100,
            out_dir: "runs".to_string(),
            run_id: None,
        }
    }
}

fn parse_f64(key: &str, v: &str) -> Result<f64> {
    v.parse()
        .map_err(|_| SolverError::InvalidSettings(format!("{}: not a number: {}", key, v)))
}

fn parse_usize(key: &str, v: &str) -> Result<usize> {
    v.parse()
        .map_err(|_| SolverError::InvalidSettings(format!("{}: not an integer: {}", key, v)))
}

fn parse_vec3(key: &str, v: &str) -> Result<[f64; 3]> {
    let parts: Vec<&str> = v.split(',').collect();
    if parts.len() != 3 {
        return Err(SolverError::InvalidSettings(format!(
            "{}: expected x,y,z, got {}",
            key, v
        )));
    }
    Ok([
        parse_f64(key, parts[0])?,
        parse_f64(key, parts[1])?,
        parse_f64(key, parts[2])?,
    ])
}

impl RunConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write_to_dir(&self, out_dir: &Path) -> Result<()> {
        let file = File::create(out_dir.join("config.json"))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Apply one `key=value` override. Unknown keys are an error.
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "nx" => self.geometry.nx = parse_usize(key, value)?,
            "ny" => self.geometry.ny = parse_usize(key, value)?,
            "dx" => self.geometry.dx = parse_f64(key, value)?,
            "dy" => self.geometry.dy = parse_f64(key, value)?,
            "dz" => self.geometry.dz = parse_f64(key, value)?,
            "ms" => self.material.ms = parse_f64(key, value)?,
            "ku" => self.material.k_u = parse_f64(key, value)?,
            "axis" => self.material.easy_axis = normalize(parse_vec3(key, value)?),
            "bext" => self.b_ext = parse_vec3(key, value)?,
            "alpha" => self.llg.alpha = parse_f64(key, value)?,
            "dt" => self.llg.dt = parse_f64(key, value)?,
            "evolver" => {
                self.evolver = EvolverKind::from_str(value).ok_or_else(|| {
                    SolverError::InvalidSettings(format!("unknown evolver: {}", value))
                })?
            }
            "init" => {
                self.init = InitKind::from_arg(value).ok_or_else(|| {
                    SolverError::InvalidSettings(format!("unknown init: {}", value))
                })?
            }
            "h0" => self.minimize.initial_h = Some(parse_f64(key, value)?),
            "maxdpns" => self.minimize.max_dpns = parse_f64(key, value)?,
            "samples" => self.minimize.samples = parse_usize(key, value)?,
            "hmax" => self.minimize.h_max = parse_f64(key, value)?,
            "hmin" => self.minimize.h_min = parse_f64(key, value)?,
            "maxiters" => self.minimize.max_iters = Some(parse_usize(key, value)?),
            "relaxdpns" => self.relax_max_deg_per_ns = parse_f64(key, value)?,
            "log" => self.console_log_every = parse_usize(key, value)?,
            "out" => self.out_dir = value.to_string(),
            "run" => self.run_id = Some(value.to_string()),
            _ => {
                return Err(SolverError::InvalidSettings(format!(
                    "unknown option: {}={}",
                    key, value
                )));
            }
        }
        Ok(())
    }
}
