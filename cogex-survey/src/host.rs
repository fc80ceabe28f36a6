use cogex_core::{Container, HitTarget, KeyId, TrialResult, WidgetState};
use std::time::Instant;

/// The experiment side of a trial. Called exactly once per trial, at the end.
pub trait Host {
    fn finish_trial(&mut self, result: TrialResult);
}

/// Host that only collects results; handy where no sequencing is needed.
#[derive(Debug, Default)]
pub struct ResultLog {
    pub results: Vec<TrialResult>,
}

impl Host for ResultLog {
    fn finish_trial(&mut self, result: TrialResult) {
        self.results.push(result);
    }
}

/// Input delivered by the host's event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    Click(HitTarget),
    KeyUp(KeyId),
    /// The loop woke up; due alarms are processed
    Tick,
}

/// Whether the widget acted on an event. A consumed key must not trigger
/// the host's own shortcut for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Consumed,
    Ignored,
}

impl EventOutcome {
    pub fn is_consumed(&self) -> bool {
        matches!(self, EventOutcome::Consumed)
    }
}

pub type FeedbackHook = Box<dyn FnMut(&TrialResult)>;

/// A widget the host drives for the duration of one trial.
pub trait TrialWidget {
    /// Renders into `container` and starts listening.
    fn start(&mut self, container: &mut Container);

    fn handle_event(
        &mut self,
        event: WidgetEvent,
        container: &mut Container,
        host: &mut dyn Host,
    ) -> EventOutcome;

    /// When the host should next deliver [`WidgetEvent::Tick`].
    fn next_wakeup(&self) -> Option<Instant>;

    fn state(&self) -> WidgetState;

    /// Tears the trial down: clears the container, cancels alarms and reports
    /// the result if one was scored. Safe to call any number of times.
    fn dispose(&mut self, container: &mut Container, host: &mut dyn Host);

    fn set_feedback_hook(&mut self, hook: FeedbackHook);
}
