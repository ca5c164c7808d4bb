// src/solver.rs
//
// Solver control loop: time integration to a stop condition, relaxation, and direct
// minimisation, with step-handler dispatch and operator interrupts at step boundaries.

use crate::condition::Condition;
use crate::error::{Result, SolverError};
use crate::evolver::{Evolver, EvolverKind};
use crate::interrupt::{Diagnostics, Flow, InterruptFlag, InterruptHandler, Operator};
use crate::minimize::{self, MinimizeReport, MinimizeSettings};
use crate::model::FieldEvolution;
use crate::ovf::SnapshotWriter;
use crate::state::{SimulationState, deg_per_ns};
use crate::stephandler::{HandlerId, StepHandler, StepHandlers};
use crate::vector_field::VectorField2D;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStop {
    /// The stop condition was met.
    Condition,
    /// Operator chose "stop" at an interrupt.
    OperatorStop,
}

#[derive(Debug, Clone, Copy)]
pub struct SolveReport {
    /// Steps committed by this call.
    pub steps: usize,
    pub t: f64,
    pub stop: SolveStop,
}

pub struct Solver {
    state: SimulationState,
    evolver: Box<dyn Evolver>,
    model: Box<dyn FieldEvolution>,
    handlers: StepHandlers,
    interrupt: InterruptHandler,
}

impl Solver {
    pub fn new(
        state: SimulationState,
        evolver: Box<dyn Evolver>,
        model: Box<dyn FieldEvolution>,
    ) -> Self {
        Self {
            state,
            evolver,
            model,
            handlers: StepHandlers::new(),
            interrupt: InterruptHandler::default(),
        }
    }

    pub fn with_operator(mut self, operator: Box<dyn Operator>) -> Self {
        self.interrupt.set_operator(operator);
        self
    }

    pub fn with_snapshot_writer(mut self, writer: Box<dyn SnapshotWriter>) -> Self {
        self.interrupt.set_snapshot_writer(writer);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Box<dyn Diagnostics>) -> Self {
        self.interrupt.set_diagnostics(diagnostics);
        self
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Setup access between runs (initial m, time reset, ...).
    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    pub fn into_state(self) -> SimulationState {
        self.state
    }

    pub fn evolver_kind(&self) -> EvolverKind {
        self.evolver.kind()
    }

    /// Handle for raising interrupts (signal handler, tests, embedding code).
    pub fn interrupt_flag(&self) -> InterruptFlag {
        self.interrupt.flag().clone()
    }

    pub fn install_sigint_handler(&self) -> Result<()> {
        self.interrupt.flag().install_sigint_handler()
    }

    pub fn add_step_handler(
        &mut self,
        handler: Box<dyn StepHandler>,
        condition: Condition,
    ) -> HandlerId {
        self.handlers.add(handler, condition)
    }

    pub fn remove_step_handler(&mut self, id: HandlerId) -> Option<Box<dyn StepHandler>> {
        self.handlers.remove(id)
    }

    pub fn step_handlers(&self) -> &StepHandlers {
        &self.handlers
    }

    /// Take one integration step, commit it, then notify step handlers.
    pub fn step(&mut self) -> Result<()> {
        let m_prev = self.state.m().clone();
        let dt = self.evolver.evolve(&mut self.state)?;

        self.state.finish_step();
        self.state.flush_cache();
        self.state.step += 1;

        let diff = VectorField2D::difference(self.state.m(), &m_prev);
        self.state.deg_per_ns = deg_per_ns(diff.abs_max(), self.state.m().abs_max(), dt);

        self.handlers.notify(&self.state);
        Ok(())
    }

    /// Integrate until `stop` holds (checked at every step boundary).
    pub fn solve(&mut self, stop: &Condition) -> Result<SolveReport> {
        tracing::info!(?stop, evolver = %self.evolver.kind(), "solve start");
        let step0 = self.state.step;

        let outcome = loop {
            match self.interrupt.at_boundary(&self.state, &mut self.handlers) {
                Ok(Flow::Proceed) => {}
                Ok(Flow::Retry) => continue,
                Ok(Flow::Stop) => break Ok(SolveStop::OperatorStop),
                Err(e) => break Err(e),
            }
            if stop.check(&self.state) {
                break Ok(SolveStop::Condition);
            }
            if let Err(e) = self.step() {
                break Err(e);
            }
        };

        self.handlers.finish();
        let stop = outcome?;

        tracing::info!(step = self.state.step, t = self.state.t, ?stop, "solve finished");
        Ok(SolveReport {
            steps: self.state.step - step0,
            t: self.state.t,
            stop,
        })
    }

    /// Integrate until the step-to-step rotation drops below `max_deg_per_ns`.
    ///
    /// Rejected up front, with the state untouched, for backends that cannot relax.
    pub fn relax(&mut self, max_deg_per_ns: f64) -> Result<SolveReport> {
        let kind = self.evolver.kind();
        if !kind.supports_relax() {
            return Err(SolverError::IncompatibleEvolver { kind });
        }
        self.solve(&Condition::relaxed(max_deg_per_ns))
    }

    /// Direct energy minimisation. Step handlers are not notified.
    pub fn minimize(&mut self, settings: &MinimizeSettings) -> Result<MinimizeReport> {
        let Solver {
            state,
            model,
            handlers,
            interrupt,
            ..
        } = self;
        let mut boundary = |s: &SimulationState| interrupt.at_boundary(s, &mut *handlers);
        minimize::minimize(state, &**model, settings, &mut boundary)
    }
}
