use serde::{Deserialize, Serialize};

/// Trial state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetState {
    #[default]
    Rendering,
    AwaitingResponse,
    TimedOut,
    Scored,
    Ended,
}

impl WidgetState {
    pub fn can_transition_to(&self, next: WidgetState) -> bool {
        use WidgetState::*;
        matches!(
            (self, next),
            (Rendering, AwaitingResponse)
                | (AwaitingResponse, Scored)
                | (AwaitingResponse, TimedOut)
                | (TimedOut, Scored)
                | (Scored, Ended)
        )
    }

    /// Input controls accept selection only while awaiting a response.
    pub fn accepts_input(&self) -> bool {
        matches!(self, WidgetState::AwaitingResponse)
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, WidgetState::Ended)
    }
}

/// Recorded result per trial. `-1` marks a value that was never set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialResult {
    pub selected_response: i64,
    pub correct: bool,
    pub rt: i64,
}

impl TrialResult {
    pub const UNSET: i64 = -1;

    pub fn pending() -> Self {
        Self {
            selected_response: Self::UNSET,
            correct: false,
            rt: Self::UNSET,
        }
    }

    pub fn selected(&self) -> Option<usize> {
        usize::try_from(self.selected_response).ok()
    }
}

impl Default for TrialResult {
    fn default() -> Self {
        Self::pending()
    }
}
