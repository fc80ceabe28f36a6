use anyhow::{Context, Result};
use cogex_core::{Container, TrialResult, WidgetState};
use cogex_survey::{EventOutcome, Host, PluginRegistry, SurveyControl, TrialWidget, WidgetEvent};
use cogex_timing::Timer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Result file row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_index: usize,
    pub question: String,
    #[serde(flatten)]
    pub result: TrialResult,
}

/// Receives the one result a trial reports
#[derive(Debug, Default)]
struct Outcome {
    reported: Option<TrialResult>,
}

impl Host for Outcome {
    fn finish_trial(&mut self, result: TrialResult) {
        self.reported = Some(result);
    }
}

/// Runs a timeline of plugin entries one trial at a time.
pub struct Session<T: Timer> {
    registry: PluginRegistry<T>,
    timer: T,
    timeline: Vec<Value>,
    next_entry: usize,
    current: Option<(usize, Box<dyn TrialWidget>)>,
    container: Container,
    outcome: Outcome,
    records: Vec<TrialRecord>,
}

impl<T: Timer + 'static> Session<T> {
    pub fn new(timeline: Vec<Value>, timer: T) -> Result<Self> {
        let mut registry = PluginRegistry::new();
        registry.register(SurveyControl)?;
        Ok(Self {
            registry,
            timer,
            timeline,
            next_entry: 0,
            current: None,
            container: Container::new(),
            outcome: Outcome::default(),
            records: Vec::new(),
        })
    }

    /// Starts the next trial. Returns false once the timeline is exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        let Some(entry) = self.timeline.get(self.next_entry) else {
            self.current = None;
            return Ok(false);
        };
        let index = self.next_entry;
        self.next_entry += 1;

        let mut widget = self
            .registry
            .create_entry(entry, self.timer.clone())
            .with_context(|| format!("timeline entry {index}"))?;
        widget.set_feedback_hook(Box::new(move |result: &TrialResult| {
            info!(trial = index, correct = result.correct, "feedback shown");
        }));
        widget.start(&mut self.container);
        info!(trial = index, of = self.timeline.len(), "trial started");
        self.current = Some((index, widget));
        Ok(true)
    }

    /// Forwards an event to the running trial, moving on when it finishes.
    pub fn dispatch(&mut self, event: WidgetEvent) -> Result<EventOutcome> {
        let Some((index, widget)) = self.current.as_mut() else {
            return Ok(EventOutcome::Ignored);
        };
        let outcome = widget.handle_event(event, &mut self.container, &mut self.outcome);
        let index = *index;
        if let Some(result) = self.outcome.reported.take() {
            self.record(index, result);
            self.advance()?;
        }
        Ok(outcome)
    }

    /// Delivers a tick if the running trial has an alarm due. Returns whether
    /// one was delivered.
    pub fn poll(&mut self, now: Instant) -> Result<bool> {
        if !self.next_wakeup().is_some_and(|at| at <= now) {
            return Ok(false);
        }
        self.dispatch(WidgetEvent::Tick)?;
        Ok(true)
    }

    pub fn next_wakeup(&self) -> Option<Instant> {
        self.current.as_ref().and_then(|(_, w)| w.next_wakeup())
    }

    /// Tears down the running trial, keeping its result if it had one.
    pub fn abort(&mut self) {
        if let Some((index, mut widget)) = self.current.take() {
            widget.dispose(&mut self.container, &mut self.outcome);
            if let Some(result) = self.outcome.reported.take() {
                self.record(index, result);
            }
        }
    }

    fn record(&mut self, index: usize, result: TrialResult) {
        let question = self.timeline[index]
            .get("question")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.records.push(TrialRecord {
            trial_index: index,
            question,
            result,
        });
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn state(&self) -> Option<WidgetState> {
        self.current.as_ref().map(|(_, w)| w.state())
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_none() && self.next_entry >= self.timeline.len()
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn write_results(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating result file {}", path.display()))?;
        serde_json::to_writer_pretty(file, &self.records).context("writing results")?;
        info!(trials = self.records.len(), path = %path.display(), "results saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::{HitTarget, KeyId};
    use cogex_timing::{ManualTimer, Timer};
    use serde_json::json;

    fn timeline() -> Vec<Value> {
        vec![
            json!({
                "type": "survey-control",
                "question": "First?",
                "options": ["yes", "no"],
                "correct_option": 0,
                "display": "radio",
                "option_keys": ["y", "n"],
                "submit_key": "Enter",
                "feedback_correct": "ok",
                "feedback_incorrect": "not ok"
            }),
            json!({
                "type": "survey-control",
                "question": "Second?",
                "options": ["a", "b", "c"],
                "correct_option": 2,
                "timeout_ms": 1000,
                "feedback_correct": "ok",
                "feedback_incorrect": "not ok"
            }),
        ]
    }

    #[test]
    fn runs_timeline_and_records_each_trial() {
        let timer = ManualTimer::new();
        let mut session = Session::new(timeline(), timer.clone()).unwrap();
        assert!(session.advance().unwrap());

        timer.advance_ms(400);
        session.dispatch(WidgetEvent::KeyUp(KeyId::parse("y"))).unwrap();
        session.dispatch(WidgetEvent::Click(HitTarget::Button)).unwrap();
        session.dispatch(WidgetEvent::KeyUp(KeyId::parse("Enter"))).unwrap();
        assert_eq!(session.records().len(), 1);
        assert_eq!(session.state(), Some(WidgetState::AwaitingResponse));

        // second trial times out and ends itself after the grace period
        timer.advance_ms(1_000);
        session.dispatch(WidgetEvent::Tick).unwrap();
        timer.advance_ms(5_000);
        session.dispatch(WidgetEvent::Tick).unwrap();

        assert!(session.is_finished());
        let records = session.records();
        assert_eq!(records[0].question, "First?");
        assert_eq!((records[0].result.correct, records[0].result.rt), (true, 400));
        assert_eq!(records[1].trial_index, 1);
        assert!(!records[1].result.correct);
        assert!(session.container().is_empty());
    }

    #[test]
    fn poll_ticks_only_when_an_alarm_is_due() {
        let timer = ManualTimer::new();
        let mut entries = timeline();
        entries[0]["timeout_ms"] = json!(1_000);
        let mut session = Session::new(entries, timer.clone()).unwrap();
        session.advance().unwrap();

        let deadline = session.next_wakeup().unwrap();
        assert!(!session.poll(timer.instant_at(0)).unwrap());
        assert_eq!(session.state(), Some(WidgetState::AwaitingResponse));

        timer.advance_ms(1_000);
        assert!(session.poll(deadline).unwrap());
        assert_eq!(session.state(), Some(WidgetState::Scored));
    }

    #[test]
    fn session_without_trials_is_finished() {
        let mut session = Session::new(Vec::new(), ManualTimer::new()).unwrap();
        assert!(!session.advance().unwrap());
        assert!(session.is_finished());
        assert!(!session.poll(Instant::now()).unwrap());
    }

    #[test]
    fn bad_entry_is_reported_with_its_index() {
        let mut entries = timeline();
        entries[0]["correct_option"] = json!(9);
        let mut session = Session::new(entries, ManualTimer::new()).unwrap();
        let err = session.advance().unwrap_err();
        assert!(format!("{err:#}").contains("timeline entry 0"));
    }

    #[test]
    fn abort_keeps_scored_result() {
        let timer = ManualTimer::new();
        let mut session = Session::new(timeline(), timer).unwrap();
        session.advance().unwrap();
        session.dispatch(WidgetEvent::Click(HitTarget::Option(1))).unwrap();
        session.dispatch(WidgetEvent::Click(HitTarget::Button)).unwrap();
        session.abort();
        assert_eq!(session.records().len(), 1);
        assert!(!session.records()[0].result.correct);
        assert!(session.state().is_none());
    }

    #[test]
    fn record_serializes_flat() {
        let record = TrialRecord {
            trial_index: 3,
            question: "Q".into(),
            result: TrialResult {
                selected_response: 1,
                correct: true,
                rt: 1200,
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["selected_response"], 1);
        assert_eq!(value["rt"], 1200);
        assert_eq!(value["trial_index"], 3);
    }
}
