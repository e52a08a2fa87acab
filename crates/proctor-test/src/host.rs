//! Recording supervisor host

use parking_lot::Mutex;

use proctor_core::{SupervisorState, ViolationEvent, ViolationKind};
use proctor_runtime::{NavigationTarget, SupervisorHost};

/// Host that records every callback
#[derive(Default)]
pub struct RecordingHost {
    violations: Mutex<Vec<ViolationEvent>>,
    states: Mutex<Vec<SupervisorState>>,
    navigations: Mutex<Vec<NavigationTarget>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn violations(&self) -> Vec<ViolationEvent> {
        self.violations.lock().clone()
    }

    pub fn violations_of(&self, kind: ViolationKind) -> usize {
        self.violations.lock().iter().filter(|v| v.kind == kind).count()
    }

    pub fn states(&self) -> Vec<SupervisorState> {
        self.states.lock().clone()
    }

    pub fn navigations(&self) -> Vec<NavigationTarget> {
        self.navigations.lock().clone()
    }

    /// Total callbacks received so far
    pub fn callbacks(&self) -> usize {
        self.violations.lock().len() + self.states.lock().len() + self.navigations.lock().len()
    }
}

impl SupervisorHost for RecordingHost {
    fn on_violation(&self, violation: &ViolationEvent) {
        self.violations.lock().push(violation.clone());
    }

    fn on_state_change(&self, state: SupervisorState) {
        self.states.lock().push(state);
    }

    fn navigate(&self, target: NavigationTarget) {
        self.navigations.lock().push(target);
    }
}
