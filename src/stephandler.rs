// src/stephandler.rs
//
// Observers notified by the solver after each committed step.

use crate::condition::Condition;
use crate::state::SimulationState;

pub trait StepHandler {
    /// Called with read-only access to the freshly committed state.
    fn handle(&mut self, state: &SimulationState);

    /// Called once when a solve finishes (normally or by operator stop).
    fn done(&mut self) {}

    /// Console loggers are the ones toggled from the interrupt menu.
    fn is_console_log(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration {
    id: HandlerId,
    handler: Box<dyn StepHandler>,
    condition: Condition,
}

/// Ordered registry. Notification order is registration order.
#[derive(Default)]
pub struct StepHandlers {
    entries: Vec<Registration>,
    next_id: u64,
}

impl StepHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handler: Box<dyn StepHandler>, condition: Condition) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Registration {
            id,
            handler,
            condition,
        });
        id
    }

    pub fn remove(&mut self, id: HandlerId) -> Option<Box<dyn StepHandler>> {
        let pos = self.entries.iter().position(|r| r.id == id)?;
        Some(self.entries.remove(pos).handler)
    }

    /// Remove every console logger; returns how many were removed.
    pub fn remove_console_logs(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|r| !r.handler.is_console_log());
        before - self.entries.len()
    }

    pub fn has_console_log(&self) -> bool {
        self.entries.iter().any(|r| r.handler.is_console_log())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<HandlerId> {
        self.entries.iter().map(|r| r.id).collect()
    }

    pub fn notify(&mut self, state: &SimulationState) {
        for r in &mut self.entries {
            if r.condition.check(state) {
                r.handler.handle(state);
            }
        }
    }

    pub fn finish(&mut self) {
        for r in &mut self.entries {
            r.handler.done();
        }
    }
}

/// One console line per notification.
#[derive(Debug, Default)]
pub struct ScreenLog;

impl StepHandler for ScreenLog {
    fn handle(&mut self, state: &SimulationState) {
        let avg = state.m().average();
        println!(
            "      [solve] step={}  t={:.6e}  h={:.3e}  avg(M)=({:.5}, {:.5}, {:.5})  deg_per_ns={:.3e}",
            state.step, state.t, state.h, avg[0], avg[1], avg[2], state.deg_per_ns
        );
    }

    fn is_console_log(&self) -> bool {
        true
    }
}

/// Progress reporter embedded in the minimizer; not part of the handler registry.
#[derive(Debug, Default)]
pub struct ScreenLogMinimizer;

impl StepHandler for ScreenLogMinimizer {
    fn handle(&mut self, state: &SimulationState) {
        let avg = state.m().average();
        println!(
            "      [minimize] step={}  h={:.3e}  avg(M)=({:.5}, {:.5}, {:.5})  deg_per_ns={:.3e}",
            state.step, state.h, avg[0], avg[1], avg[2], state.deg_per_ns_minimizer
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid2D;
    use crate::vector_field::VectorField2D;
    use std::sync::{Arc, Mutex};

    struct Tag(&'static str, Arc<Mutex<Vec<&'static str>>>);

    impl StepHandler for Tag {
        fn handle(&mut self, _state: &SimulationState) {
            self.1.lock().unwrap().push(self.0);
        }
    }

    fn state() -> SimulationState {
        SimulationState::new(VectorField2D::new(Grid2D::new(1, 1, 1.0, 1.0, 1.0)), 1e-13)
    }

    #[test]
    fn notifies_in_registration_order_and_honours_conditions() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hs = StepHandlers::new();
        let a = hs.add(Box::new(Tag("a", log.clone())), Condition::Always);
        let b = hs.add(Box::new(Tag("b", log.clone())), Condition::EveryNthStep(2));
        let c = hs.add(Box::new(Tag("c", log.clone())), Condition::Always);
        assert_eq!(hs.ids(), vec![a, b, c]);

        let mut s = state();
        s.step = 1;
        hs.notify(&s);
        s.step = 2;
        hs.notify(&s);
        assert_eq!(*log.lock().unwrap(), vec!["a", "c", "a", "b", "c"]);

        assert!(hs.remove(b).is_some());
        assert!(hs.remove(b).is_none());
        assert_eq!(hs.ids(), vec![a, c]);
    }

    #[test]
    fn console_logs_are_found_and_removed() {
        let mut hs = StepHandlers::new();
        assert!(!hs.has_console_log());
        hs.add(Box::new(ScreenLog), Condition::EveryNthStep(100));
        hs.add(Box::new(ScreenLog), Condition::Always);
        hs.add(Box::new(ScreenLogMinimizer), Condition::Always);
        assert!(hs.has_console_log());
        assert_eq!(hs.remove_console_logs(), 2);
        assert!(!hs.has_console_log());
        assert_eq!(hs.len(), 1);
    }
}
