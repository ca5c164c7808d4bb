// src/interrupt.rs
//
// Operator interrupt handling.
//
// A SIGINT only raises a flag. The solver polls the flag at step boundaries and, when it
// is set, suspends and asks the operator what to do:
//
//   Running --signal--> Interrupted --menu--> Running | Stopped | Aborted
//
// The handler never unwinds; it returns an `InterruptAction` the solver matches on.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::condition::Condition;
use crate::error::Result;
use crate::ovf::{OvfSnapshotWriter, SNAPSHOT_SUFFIX, SnapshotWriter};
use crate::state::SimulationState;
use crate::stephandler::{ScreenLog, StepHandlers};

/// Notification stride of the console log added by the toggle option.
pub const CONSOLE_LOG_EVERY: usize = 100;

pub const MENU_HEADER: &str = "Solver interrupted by signal SIGINT (ctrl-c)";

/// Set asynchronously, consumed at step boundaries.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Test-and-clear.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    /// Route SIGINT (ctrl-c) to this flag. Only one handler can be installed per process.
    pub fn install_sigint_handler(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.raise())?;
        Ok(())
    }
}

/// Operator interaction channel.
pub trait Operator {
    /// Show `options` and return the chosen one, 1-based.
    fn menu(&mut self, header: &str, text: &str, options: &[String]) -> io::Result<usize>;

    fn getline(&mut self, prompt: &str) -> io::Result<String>;
}

/// Reads answers from stdin; re-prompts until the answer is a listed option.
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl ConsoleOperator {
    fn read_line() -> io::Result<Option<String>> {
        let mut line = String::new();
        let n = io::stdin().lock().read_line(&mut line)?;
        Ok((n > 0).then(|| line.trim().to_string()))
    }
}

impl Operator for ConsoleOperator {
    fn menu(&mut self, header: &str, text: &str, options: &[String]) -> io::Result<usize> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", header)?;
        writeln!(out, "{}", "=".repeat(header.len()))?;
        writeln!(out, "{}", text)?;
        for (k, opt) in options.iter().enumerate() {
            writeln!(out, "  {}. {}", k + 1, opt)?;
        }
        loop {
            write!(out, "Choice: ")?;
            out.flush()?;
            // EOF on stdin: nobody is there to answer, keep running.
            let Some(answer) = Self::read_line()? else {
                return Ok(1);
            };
            match answer.parse::<usize>() {
                Ok(k) if (1..=options.len()).contains(&k) => return Ok(k),
                _ => writeln!(out, "Please enter a number between 1 and {}.", options.len())?,
            }
        }
    }

    fn getline(&mut self, prompt: &str) -> io::Result<String> {
        println!("{}", prompt);
        Ok(Self::read_line()?.unwrap_or_default())
    }
}

/// Diagnostic entry point reached through menu option 6.
pub trait Diagnostics {
    fn enter(&mut self, state: &SimulationState);
}

/// Dumps the state to stdout and returns.
#[derive(Debug, Default)]
pub struct StateDump;

impl Diagnostics for StateDump {
    fn enter(&mut self, state: &SimulationState) {
        let m = state.m();
        println!("--- diagnostics ---");
        println!("{}", describe_state(state));
        println!("   max|M| = {:.6e}", m.abs_max());
        println!("       h = {:.6e}", state.h);
        println!(
            " deg_per_ns_minimizer = {:.6e}",
            state.deg_per_ns_minimizer
        );
        if let (Some(first), Some(last)) = (m.data.first(), m.data.last()) {
            println!("  M[first] = {:?}", first);
            println!("   M[last] = {:?}", last);
        }
        println!("--- end diagnostics ---");
    }
}

/// Outcome of one visit to the interrupt menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Resume the interrupted step.
    Continue,
    /// Resume, but re-enter the loop at the boundary without committing a step.
    Retry,
    /// Finish now and return the current state as the result.
    Stop,
    /// Propagate a user abort to the caller.
    Abort,
    /// Exit the process immediately.
    Terminate,
    EnterDiagnostic,
}

/// What the stepping loop does after a step boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Proceed,
    Retry,
    Stop,
}

fn describe_state(state: &SimulationState) -> String {
    let avg = state.m().average();
    let mut text = String::new();
    text += "State:\n";
    text += &format!("       step = {}\n", state.step);
    text += &format!("          t = {:e}\n", state.t);
    text += &format!("     avg(M) = ({}, {}, {})\n", avg[0], avg[1], avg[2]);
    text += &format!(" deg_per_ns = {}\n", state.deg_per_ns);
    text += "\n";
    text += &format!("Mesh: {}\n", state.grid());
    text
}

pub struct InterruptHandler {
    flag: InterruptFlag,
    operator: Box<dyn Operator>,
    snapshot: Box<dyn SnapshotWriter>,
    diagnostics: Box<dyn Diagnostics>,
}

impl Default for InterruptHandler {
    fn default() -> Self {
        Self::new(InterruptFlag::new())
    }
}

impl InterruptHandler {
    pub fn new(flag: InterruptFlag) -> Self {
        Self {
            flag,
            operator: Box::new(ConsoleOperator),
            snapshot: Box::new(OvfSnapshotWriter),
            diagnostics: Box::new(StateDump),
        }
    }

    pub fn flag(&self) -> &InterruptFlag {
        &self.flag
    }

    pub fn set_operator(&mut self, operator: Box<dyn Operator>) {
        self.operator = operator;
    }

    pub fn set_snapshot_writer(&mut self, writer: Box<dyn SnapshotWriter>) {
        self.snapshot = writer;
    }

    pub fn set_diagnostics(&mut self, diagnostics: Box<dyn Diagnostics>) {
        self.diagnostics = diagnostics;
    }

    /// Present the menu and carry out the options that act in place (save, toggle log).
    pub fn handle(
        &mut self,
        state: &SimulationState,
        handlers: &mut StepHandlers,
    ) -> Result<InterruptAction> {
        println!();
        let mut text = describe_state(state);
        text += "\nOptions:";

        let console_on = handlers.has_console_log();
        let options = vec![
            "Continue".to_string(),
            "Stop solver and return the current state as the result".to_string(),
            format!(
                "Save current magnetization to {} file, then continue",
                SNAPSHOT_SUFFIX
            ),
            "Raise user abort".to_string(),
            "Kill program".to_string(),
            "Start debugger".to_string(),
            format!(
                "Toggle console log (now:{})",
                if console_on { "enabled" } else { "disabled" }
            ),
        ];

        let answer = self.operator.menu(MENU_HEADER, &text, &options)?;
        tracing::info!(answer, step = state.step, "interrupt menu answered");

        match answer {
            1 => Ok(InterruptAction::Continue),
            2 => Ok(InterruptAction::Stop),
            3 => {
                let name = self.operator.getline(&format!(
                    "Enter file name ('{}' is appended automatically)",
                    SNAPSHOT_SUFFIX
                ))?;
                let path = PathBuf::from(format!("{}{}", name.trim(), SNAPSHOT_SUFFIX));
                self.snapshot.write_snapshot(&path, state.m(), state.t)?;
                println!("Done.");
                Ok(InterruptAction::Retry)
            }
            4 => Ok(InterruptAction::Abort),
            5 => Ok(InterruptAction::Terminate),
            6 => Ok(InterruptAction::EnterDiagnostic),
            7 => {
                if console_on {
                    handlers.remove_console_logs();
                    println!("Disabled console log.");
                } else {
                    handlers.add(
                        Box::new(ScreenLog),
                        Condition::EveryNthStep(CONSOLE_LOG_EVERY),
                    );
                    println!("Enabled console log.");
                }
                Ok(InterruptAction::Continue)
            }
            other => panic!("interrupt menu returned option {} outside 1..=7", other),
        }
    }

    /// Poll the flag at a step boundary and resolve any pending interrupt.
    ///
    /// Errors with `SolverError::UserAbort` when the operator aborts.
    pub fn at_boundary(
        &mut self,
        state: &SimulationState,
        handlers: &mut StepHandlers,
    ) -> Result<Flow> {
        if !self.flag.take() {
            return Ok(Flow::Proceed);
        }
        match self.handle(state, handlers)? {
            InterruptAction::Continue => Ok(Flow::Proceed),
            InterruptAction::Retry => Ok(Flow::Retry),
            InterruptAction::Stop => Ok(Flow::Stop),
            InterruptAction::Abort => Err(crate::error::SolverError::UserAbort),
            InterruptAction::Terminate => terminate(),
            InterruptAction::EnterDiagnostic => {
                self.diagnostics.enter(state);
                Ok(Flow::Proceed)
            }
        }
    }
}

/// Immediate process exit requested from the menu. No cleanup runs.
fn terminate() -> ! {
    tracing::error!("killed by operator");
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid2D;
    use crate::vector_field::VectorField2D;

    struct Fixed(usize);

    impl Operator for Fixed {
        fn menu(&mut self, _h: &str, _t: &str, _o: &[String]) -> io::Result<usize> {
            Ok(self.0)
        }
        fn getline(&mut self, _p: &str) -> io::Result<String> {
            Ok(String::new())
        }
    }

    fn state() -> SimulationState {
        SimulationState::new(VectorField2D::new(Grid2D::new(2, 2, 1.0, 1.0, 1.0)), 1e-13)
    }

    #[test]
    fn take_clears_the_flag() {
        let flag = InterruptFlag::new();
        let other = flag.clone();
        assert!(!flag.take());
        other.raise();
        assert!(flag.is_raised());
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn answers_map_to_actions() {
        let expected = [
            (1, InterruptAction::Continue),
            (2, InterruptAction::Stop),
            (4, InterruptAction::Abort),
            (5, InterruptAction::Terminate),
            (6, InterruptAction::EnterDiagnostic),
        ];
        let s = state();
        for (answer, action) in expected {
            let mut h = InterruptHandler::default();
            h.set_operator(Box::new(Fixed(answer)));
            let mut handlers = StepHandlers::new();
            assert_eq!(h.handle(&s, &mut handlers).unwrap(), action);
            assert!(handlers.is_empty());
        }
    }

    #[test]
    fn boundary_without_a_pending_interrupt_never_asks() {
        let mut h = InterruptHandler::default();
        // Would panic if the menu were shown.
        h.set_operator(Box::new(Fixed(0)));
        let mut handlers = StepHandlers::new();
        assert_eq!(h.at_boundary(&state(), &mut handlers).unwrap(), Flow::Proceed);
    }

    #[test]
    fn describe_state_mentions_step_and_mesh() {
        let mut s = state();
        s.step = 42;
        let text = describe_state(&s);
        assert!(text.contains("step = 42"));
        assert!(text.contains("Mesh: RectangularMesh((2, 2, 1)"));
    }
}
