use cogex_core::{TrialResult, WidgetState};
use cogex_timing::{AlarmId, Alarms};
use tracing::debug;

/// Fixed time feedback stays on screen after a forced timeout.
pub const GRACE_PERIOD_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmKind {
    Deadline,
    Grace,
}

/// Everything that changes during one trial. Owned by the widget and handed
/// by reference to its handlers.
#[derive(Debug)]
pub struct Trial {
    pub state: WidgetState,
    pub start_ns: u64,
    pub result: TrialResult,
    pub keys_enabled: bool,
    pub alarms: Alarms<AlarmKind>,
    pub deadline: Option<AlarmId>,
    pub grace: Option<AlarmId>,
    /// Set once teardown ran, whichever path got there
    pub disposed: bool,
}

impl Trial {
    pub fn new() -> Self {
        Self {
            state: WidgetState::Rendering,
            start_ns: 0,
            result: TrialResult::pending(),
            keys_enabled: false,
            alarms: Alarms::new(),
            deadline: None,
            grace: None,
            disposed: false,
        }
    }

    /// Moves to `next` if the lifecycle allows it.
    pub fn transition(&mut self, next: WidgetState) -> bool {
        if self.disposed || !self.state.can_transition_to(next) {
            debug!(from = ?self.state, to = ?next, "transition refused");
            return false;
        }
        debug!(from = ?self.state, to = ?next, "transition");
        self.state = next;
        true
    }

    pub fn cancel_deadline(&mut self) {
        if let Some(id) = self.deadline.take() {
            self.alarms.cancel(id);
        }
    }

    /// Cancels every pending alarm and marks the trial torn down.
    /// Returns false when teardown already happened.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        let cancelled = self.alarms.cancel_all();
        self.deadline = None;
        self.grace = None;
        self.disposed = true;
        debug!(cancelled, "trial disposed");
        true
    }
}

impl Default for Trial {
    fn default() -> Self {
        Self::new()
    }
}
