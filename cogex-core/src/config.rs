use crate::key::KeyId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the options of a control question are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Dropdown,
    Radio,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("correct option {index} is outside the option list (length {len})")]
    CorrectOptionOutOfRange { index: usize, len: usize },

    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// Host supplied description of one control-question trial.
///
/// Field names follow the plugin parameter names so timeline files written
/// for the browser plugin deserialize unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    #[serde(default)]
    pub display: DisplayMode,
    #[serde(default)]
    pub option_keys: Option<Vec<KeyId>>,
    #[serde(default)]
    pub submit_key: Option<KeyId>,
    #[serde(default = "default_button_text")]
    pub button_text: String,
    #[serde(default = "default_continue_text")]
    pub continue_text: String,
    pub feedback_correct: String,
    pub feedback_incorrect: String,
    /// Trusted HTML shown below the controls.
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_button_text() -> String {
    "Submit".to_string()
}

fn default_continue_text() -> String {
    "Continue".to_string()
}

impl WidgetConfig {
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        correct_option: usize,
        feedback_correct: impl Into<String>,
        feedback_incorrect: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            options,
            correct_option,
            display: DisplayMode::default(),
            option_keys: None,
            submit_key: None,
            button_text: default_button_text(),
            continue_text: default_continue_text(),
            feedback_correct: feedback_correct.into(),
            feedback_incorrect: feedback_incorrect.into(),
            instructions: None,
            timeout_ms: None,
        }
    }

    pub fn with_display(mut self, display: DisplayMode) -> Self {
        self.display = display;
        self
    }

    pub fn with_option_keys<K: Into<KeyId>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.option_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_submit_key(mut self, key: impl Into<KeyId>) -> Self {
        self.submit_key = Some(key.into());
        self
    }

    pub fn with_instructions(mut self, html: impl Into<String>) -> Self {
        self.instructions = Some(html.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Rejects configurations that cannot be scored.
    ///
    /// A malformed key table is not an error here; see [`Self::key_table`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.correct_option >= self.options.len() {
            return Err(ConfigError::CorrectOptionOutOfRange {
                index: self.correct_option,
                len: self.options.len(),
            });
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Per-option key bindings, or `None` when absent or when their count
    /// does not match the option count.
    pub fn key_table(&self) -> Option<&[KeyId]> {
        self.option_keys
            .as_deref()
            .filter(|keys| keys.len() == self.options.len())
    }

    /// True when a key table was given but has the wrong length.
    pub fn key_table_mismatched(&self) -> bool {
        self.option_keys.is_some() && self.key_table().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> WidgetConfig {
        WidgetConfig::new(
            "Which letter comes second?",
            vec!["A".into(), "B".into(), "C".into()],
            1,
            "Correct!",
            "Incorrect.",
        )
    }

    #[test]
    fn defaults_fill_in_from_json() {
        let json = r#"{
            "question": "Q",
            "options": ["x", "y"],
            "correct_option": 0,
            "feedback_correct": "yes",
            "feedback_incorrect": "no"
        }"#;
        let config: WidgetConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.display, DisplayMode::Dropdown);
        assert_eq!(config.button_text, "Submit");
        assert_eq!(config.continue_text, "Continue");
        assert!(config.timeout_ms.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn radio_mode_parses() {
        let json = r#"{
            "question": "Q",
            "options": ["x"],
            "correct_option": 0,
            "display": "radio",
            "option_keys": ["F"],
            "submit_key": "Enter",
            "timeout_ms": 30000,
            "feedback_correct": "yes",
            "feedback_incorrect": "no"
        }"#;
        let config: WidgetConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.display, DisplayMode::Radio);
        assert_eq!(config.key_table().unwrap()[0].as_str(), "f");
        assert_eq!(config.timeout_ms, Some(30000));
    }

    #[test]
    fn correct_index_out_of_range_is_rejected() {
        let mut config = abc();
        config.correct_option = 3;
        assert_eq!(
            config.validate(),
            Err(ConfigError::CorrectOptionOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn empty_options_are_rejected() {
        let mut config = abc();
        config.options.clear();
        config.correct_option = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CorrectOptionOutOfRange { len: 0, .. })
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert_eq!(abc().with_timeout_ms(0).validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn mismatched_key_table_degrades_without_error() {
        let config = abc().with_option_keys(["a", "b"]);
        assert!(config.validate().is_ok());
        assert!(config.key_table().is_none());
        assert!(config.key_table_mismatched());

        let config = abc().with_option_keys(["a", "b", "c"]);
        assert_eq!(config.key_table().map(<[KeyId]>::len), Some(3));
        assert!(!config.key_table_mismatched());
    }
}
