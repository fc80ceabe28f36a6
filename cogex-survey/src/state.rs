use super::host::{EventOutcome, FeedbackHook, Host, TrialWidget, WidgetEvent};
use super::markup;
use super::trial::{AlarmKind, Trial, GRACE_PERIOD_MS};
use cogex_core::{
    ConfigError, Container, Feedback, HitTarget, KeyId, Tone, TrialResult, WidgetConfig,
    WidgetState,
};
use cogex_timing::Timer;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Why a submission was turned down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoSelection,
    NotAwaiting,
    /// The deadline passed before the submission arrived
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Scored(TrialResult),
    Rejected(Rejection),
}

/// A multiple-choice control question with optional key bindings and
/// timeout.
pub struct ControlQuestion<T: Timer> {
    config: WidgetConfig,
    timer: T,
    trial: Trial,
    feedback_hook: Option<FeedbackHook>,
}

impl<T: Timer> ControlQuestion<T> {
    /// Fails fast on configurations that cannot be scored.
    pub fn new(config: WidgetConfig, timer: T) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            timer,
            trial: Trial::new(),
            feedback_hook: None,
        })
    }

    /// Called right after feedback is shown, on both the submit and the
    /// timeout path.
    pub fn with_feedback_hook(mut self, hook: impl FnMut(&TrialResult) + 'static) -> Self {
        self.feedback_hook = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn result(&self) -> &TrialResult {
        &self.trial.result
    }

    pub fn keys_enabled(&self) -> bool {
        self.trial.keys_enabled
    }

    pub fn next_deadline_ns(&self) -> Option<u64> {
        self.trial.alarms.next_deadline()
    }

    /// Scores the current selection, as the submit button does.
    pub fn submit(&mut self, container: &mut Container) -> SubmitOutcome {
        if self.trial.state != WidgetState::AwaitingResponse {
            return SubmitOutcome::Rejected(Rejection::NotAwaiting);
        }
        if self.deadline_passed() {
            self.trial.cancel_deadline();
            self.time_out(container);
            return SubmitOutcome::Rejected(Rejection::TimedOut);
        }
        let Some(view) = container.view_mut() else {
            return SubmitOutcome::Rejected(Rejection::NotAwaiting);
        };
        let Some(selected) = view.control.selection() else {
            debug!("submission rejected, nothing selected");
            return SubmitOutcome::Rejected(Rejection::NoSelection);
        };

        let rt = self.timer.elapsed(self.trial.start_ns).as_millis() as i64;
        self.trial.cancel_deadline();
        view.control.lock();

        let correct = selected == self.config.correct_option;
        self.trial.result = TrialResult {
            selected_response: selected as i64,
            correct,
            rt,
        };
        self.trial.transition(WidgetState::Scored);
        info!(selected, correct, rt_ms = rt, "control question answered");

        self.present_feedback(container);
        SubmitOutcome::Scored(self.trial.result)
    }

    fn on_button(&mut self, container: &mut Container, host: &mut dyn Host) -> EventOutcome {
        match self.trial.state {
            WidgetState::AwaitingResponse => {
                self.submit(container);
                EventOutcome::Consumed
            }
            WidgetState::Scored => {
                self.finish(container, host);
                EventOutcome::Consumed
            }
            _ => EventOutcome::Ignored,
        }
    }

    fn on_select(&mut self, container: &mut Container, target: HitTarget) -> EventOutcome {
        if !self.trial.state.accepts_input() {
            return EventOutcome::Ignored;
        }
        let Some(view) = container.view_mut() else {
            return EventOutcome::Ignored;
        };
        let len = view.control.options().len();
        if len == 0 {
            return EventOutcome::Ignored;
        }
        let current = view.control.selection();
        let index = match target {
            HitTarget::Option(index) => index,
            HitTarget::DropdownNext => current.map_or(0, |i| (i + 1) % len),
            HitTarget::DropdownPrevious => current.map_or(len - 1, |i| (i + len - 1) % len),
            HitTarget::Button => return EventOutcome::Ignored,
        };
        if view.control.select(index) {
            view.button.enabled = true;
            debug!(index, "option selected");
            EventOutcome::Consumed
        } else {
            EventOutcome::Ignored
        }
    }

    fn on_key(&mut self, key: &KeyId, container: &mut Container, host: &mut dyn Host) -> EventOutcome {
        if self.trial.keys_enabled && self.trial.state.accepts_input() {
            let index = self
                .config
                .key_table()
                .and_then(|keys| keys.iter().position(|k| k == key));
            if let Some(index) = index {
                return self.on_select(container, HitTarget::Option(index));
            }
        }
        if self.config.submit_key.as_ref() == Some(key) {
            return self.on_button(container, host);
        }
        EventOutcome::Ignored
    }

    fn deadline_passed(&self) -> bool {
        self.trial
            .deadline
            .and_then(|id| self.trial.alarms.deadline_of(id))
            .is_some_and(|at| at <= self.timer.now())
    }

    fn on_tick(&mut self, container: &mut Container, host: &mut dyn Host) -> EventOutcome {
        let now = self.timer.now();
        let due = self.trial.alarms.take_due(now);
        let mut outcome = EventOutcome::Ignored;
        for (id, kind) in due {
            match kind {
                AlarmKind::Deadline if self.trial.deadline == Some(id) => {
                    self.trial.deadline = None;
                    self.time_out(container);
                    outcome = EventOutcome::Consumed;
                }
                AlarmKind::Grace if self.trial.grace == Some(id) => {
                    self.trial.grace = None;
                    self.finish(container, host);
                    outcome = EventOutcome::Consumed;
                }
                _ => warn!(?id, ?kind, "stale alarm ignored"),
            }
        }
        outcome
    }

    fn time_out(&mut self, container: &mut Container) {
        if !self.trial.transition(WidgetState::TimedOut) {
            return;
        }
        let selected = container.view_mut().and_then(|view| {
            view.control.lock();
            view.control.selection()
        });
        self.trial.result = TrialResult {
            selected_response: selected.map_or(TrialResult::UNSET, |i| i as i64),
            correct: false,
            rt: TrialResult::UNSET,
        };
        self.trial.transition(WidgetState::Scored);
        info!(timeout_ms = ?self.config.timeout_ms, "control question timed out");

        self.present_feedback(container);
        // counted from the deadline itself so a late tick does not stretch the trial
        let deadline_at = self.timer.after(
            self.trial.start_ns,
            Duration::from_millis(self.config.timeout_ms.unwrap_or_default()),
        );
        let at = self
            .timer
            .after(deadline_at, Duration::from_millis(GRACE_PERIOD_MS));
        self.trial.grace = Some(self.trial.alarms.schedule(AlarmKind::Grace, at));
    }

    fn present_feedback(&mut self, container: &mut Container) {
        let (text, tone) = if self.trial.result.correct {
            (&self.config.feedback_correct, Tone::Correct)
        } else {
            (&self.config.feedback_incorrect, Tone::Incorrect)
        };
        if let Some(view) = container.view_mut() {
            view.feedback = Some(Feedback {
                text: text.clone(),
                tone,
            });
            view.button.label = self.config.continue_text.clone();
            view.button.enabled = true;
        }
        if let Some(hook) = self.feedback_hook.as_mut() {
            hook(&self.trial.result);
        }
    }

    /// Ends a scored trial and reports to the host. No-op in any other state.
    fn finish(&mut self, container: &mut Container, host: &mut dyn Host) {
        if !self.trial.transition(WidgetState::Ended) {
            return;
        }
        self.trial.dispose();
        container.clear();
        info!(result = ?self.trial.result, "trial finished");
        host.finish_trial(self.trial.result);
    }
}

impl<T: Timer> TrialWidget for ControlQuestion<T> {
    fn start(&mut self, container: &mut Container) {
        if self.trial.state != WidgetState::Rendering || self.trial.disposed {
            return;
        }
        container.mount(markup::render(&self.config));
        self.trial.start_ns = self.timer.now();

        self.trial.keys_enabled = self.config.key_table().is_some();
        if self.config.key_table_mismatched() {
            warn!(
                options = self.config.options.len(),
                keys = self.config.option_keys.as_ref().map_or(0, Vec::len),
                "option key count does not match option count, key selection disabled"
            );
        }

        if let Some(timeout_ms) = self.config.timeout_ms {
            let at = self
                .timer
                .after(self.trial.start_ns, Duration::from_millis(timeout_ms));
            self.trial.deadline = Some(self.trial.alarms.schedule(AlarmKind::Deadline, at));
        }

        self.trial.transition(WidgetState::AwaitingResponse);
        info!(question = %self.config.question, options = self.config.options.len(), "control question shown");
    }

    fn handle_event(
        &mut self,
        event: WidgetEvent,
        container: &mut Container,
        host: &mut dyn Host,
    ) -> EventOutcome {
        if self.trial.disposed {
            return EventOutcome::Ignored;
        }
        // due alarms fire before input; input aimed at the old state is dropped
        if !matches!(event, WidgetEvent::Tick) {
            let before = self.trial.state;
            self.on_tick(container, host);
            if self.trial.state != before {
                return EventOutcome::Consumed;
            }
        }
        match event {
            WidgetEvent::Click(HitTarget::Button) => self.on_button(container, host),
            WidgetEvent::Click(target) => self.on_select(container, target),
            WidgetEvent::KeyUp(key) => self.on_key(&key, container, host),
            WidgetEvent::Tick => self.on_tick(container, host),
        }
    }

    fn next_wakeup(&self) -> Option<Instant> {
        self.next_deadline_ns().map(|ts| self.timer.instant_at(ts))
    }

    fn state(&self) -> WidgetState {
        self.trial.state
    }

    fn dispose(&mut self, container: &mut Container, host: &mut dyn Host) {
        if self.trial.state == WidgetState::Scored {
            self.finish(container, host);
        } else if self.trial.dispose() {
            container.clear();
            debug!(state = ?self.trial.state, "trial aborted before scoring");
        }
    }

    fn set_feedback_hook(&mut self, hook: FeedbackHook) {
        self.feedback_hook = Some(hook);
    }
}

