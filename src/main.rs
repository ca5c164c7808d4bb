// src/main.rs
//
// Driver for minimize / relax runs on a small film with local field terms.
//
// Examples:
//
//   cargo run --release -- minimize init=tilt ku=5e5
//       -> direct minimisation from a 45° tilt toward the easy axis.
//
//   cargo run --release -- relax init=bloch alpha=1 dt=5e-14 log=200
//       -> damped Euler relaxation of a Bloch wall, console line every 200 steps.
//
//   cargo run --release -- config=runs/prev/config.json maxdpns=1e-3
//       -> rerun a saved configuration with a tighter convergence threshold.
//
// Press ctrl-c during a run for the interrupt menu (continue, stop, save, ...).
//
// Outputs (per run directory):
//   runs/<run_id>/
//     ├── config.json
//     └── m_final.omf

use std::env;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::EnvFilter;

use llg_solver::condition::Condition;
use llg_solver::config::{RunConfig, RunMode};
use llg_solver::evolver::{Evolver, EvolverKind};
use llg_solver::llg::EulerEvolver;
use llg_solver::model::{LocalField, TorqueDescent};
use llg_solver::ovf::{OvfMeta, write_ovf2_text};
use llg_solver::state::SimulationState;
use llg_solver::stephandler::ScreenLog;
use llg_solver::{Solver, SolverError};

fn print_usage() {
    eprintln!(
        r#"Usage:
  cargo run -- [minimize|relax] [config=FILE.json]
             [init=uniform|tilt|bloch] [evolver=euler|rk23|rkf45|cvode]
             [nx=N] [ny=N] [dx=VAL] [dy=VAL] [dz=VAL]
             [ms=VAL] [ku=VAL] [axis=X,Y,Z] [bext=X,Y,Z] [alpha=VAL] [dt=VAL]
             [h0=VAL] [maxdpns=VAL] [samples=N] [hmin=VAL] [hmax=VAL] [maxiters=N]
             [relaxdpns=VAL] [log=N] [out=DIR] [run=RUN_ID]

Notes:
  - `config=` is applied first; every other key=value overrides it.
  - Only the euler backend is built into this driver.
"#
    );
}

fn sanitize_run_id(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn default_run_id(cfg: &RunConfig) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| std::time::Duration::from_secs(0));
    let mode = match cfg.mode {
        RunMode::Minimize => "minimize",
        RunMode::Relax => "relax",
    };
    format!(
        "{}{:03}_{}_{}",
        now.as_secs(),
        now.subsec_millis(),
        mode,
        cfg.evolver
    )
}

fn unique_run_dir(out_root: &str, run_id: &str) -> PathBuf {
    let base = PathBuf::from(out_root);
    let dir = base.join(run_id);
    if !dir.exists() {
        return dir;
    }
    (1..1000)
        .map(|k| base.join(format!("{}_{}", run_id, k)))
        .find(|cand| !cand.exists())
        .unwrap_or(dir)
}

fn parse_args(argv: &[String]) -> Result<Option<RunConfig>, SolverError> {
    let mut cfg = match argv.iter().find_map(|a| a.strip_prefix("config=")) {
        Some(path) => RunConfig::from_path(Path::new(path))?,
        None => RunConfig::default(),
    };

    for arg in argv {
        if arg == "-h" || arg == "--help" || arg == "help" {
            print_usage();
            return Ok(None);
        }
        match arg.as_str() {
            "minimize" => cfg.mode = RunMode::Minimize,
            "relax" => cfg.mode = RunMode::Relax,
            _ => {
                let Some((key, value)) = arg.split_once('=') else {
                    return Err(SolverError::InvalidSettings(format!(
                        "unrecognised argument: {}",
                        arg
                    )));
                };
                if key != "config" {
                    cfg.apply_override(key, value)?;
                }
            }
        }
    }
    Ok(Some(cfg))
}

fn build_evolver(cfg: &RunConfig, field: LocalField) -> Result<Box<dyn Evolver>, SolverError> {
    match cfg.evolver {
        EvolverKind::Euler => Ok(Box::new(EulerEvolver::new(field, cfg.llg))),
        other => Err(SolverError::InvalidSettings(format!(
            "the {} backend is not built into this driver",
            other
        ))),
    }
}

fn run(cfg: RunConfig) -> Result<(), SolverError> {
    cfg.minimize.validate()?;

    let run_id = sanitize_run_id(
        &cfg.run_id
            .clone()
            .unwrap_or_else(|| default_run_id(&cfg)),
    );
    let run_dir = unique_run_dir(&cfg.out_dir, &run_id);
    create_dir_all(&run_dir)?;
    cfg.write_to_dir(&run_dir)?;

    let field = LocalField {
        b_ext: cfg.b_ext,
        material: cfg.material,
    };
    let state = SimulationState::new(cfg.init.build(cfg.geometry), cfg.llg.dt);
    let model = TorqueDescent {
        field,
        gamma: cfg.llg.gamma,
    };

    let mut solver = Solver::new(state, build_evolver(&cfg, field)?, Box::new(model));
    if let Err(e) = solver.install_sigint_handler() {
        tracing::warn!("interrupt menu unavailable: {}", e);
    }
    if cfg.console_log_every > 0 {
        solver.add_step_handler(
            Box::new(ScreenLog),
            Condition::EveryNthStep(cfg.console_log_every),
        );
    }

    println!("run dir: {}", run_dir.display());
    println!("mesh:    {}", solver.state().grid());

    match cfg.mode {
        RunMode::Minimize => {
            let rep = solver.minimize(&cfg.minimize)?;
            println!(
                "minimize: {:?} after {} iterations (deg/ns = {:.3e}, h = {:.3e})",
                rep.stop, rep.iters, rep.deg_per_ns, rep.final_h
            );
        }
        RunMode::Relax => {
            let rep = solver.relax(cfg.relax_max_deg_per_ns)?;
            println!(
                "relax: {:?} after {} steps (t = {:.6e} s, deg/ns = {:.3e})",
                rep.stop,
                rep.steps,
                rep.t,
                solver.state().deg_per_ns
            );
        }
    }

    let state = solver.state();
    let avg = state.m().average();
    println!("avg(M) = ({:.6}, {:.6}, {:.6})", avg[0], avg[1], avg[2]);

    write_ovf2_text(
        &run_dir.join("m_final.omf"),
        state.m(),
        &OvfMeta::magnetization().with_total_sim_time(state.t),
    )?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = env::args().skip(1).collect();
    let cfg = match parse_args(&argv) {
        Ok(Some(cfg)) => cfg,
        Ok(None) => return,
        Err(e) => {
            eprintln!("error: {}", e);
            print_usage();
            std::process::exit(2);
        }
    };

    match run(cfg) {
        Ok(()) => {}
        Err(SolverError::UserAbort) => {
            eprintln!("aborted by user");
            std::process::exit(130);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
