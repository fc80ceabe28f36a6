use super::host::TrialWidget;
use super::state::ControlQuestion;
use cogex_core::{ConfigError, WidgetConfig};
use cogex_timing::Timer;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin `{0}` is already registered")]
    Duplicate(&'static str),

    #[error("no plugin registered under `{0}`")]
    Unknown(String),

    #[error("timeline entry has no `type` field")]
    MissingType,

    #[error("invalid parameters for `{plugin}`: {source}")]
    InvalidParameters {
        plugin: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Int,
    Complex,
    Keys,
    Html,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterDefault {
    Required,
    None,
    Text(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct ParameterInfo {
    pub name: &'static str,
    pub pretty_name: &'static str,
    pub kind: ParameterType,
    pub default: ParameterDefault,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct PluginInfo {
    pub name: &'static str,
    pub parameters: &'static [ParameterInfo],
}

impl PluginInfo {
    pub fn parameter(&self, name: &str) -> Option<&ParameterInfo> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required(&self) -> impl Iterator<Item = &ParameterInfo> {
        self.parameters
            .iter()
            .filter(|p| p.default == ParameterDefault::Required)
    }
}

/// Something the host can instantiate per trial from timeline parameters
pub trait Plugin<T: Timer> {
    fn info(&self) -> &'static PluginInfo;

    fn create(&self, params: &Value, timer: T) -> Result<Box<dyn TrialWidget>, PluginError>;
}

/// The control-question plugin
#[derive(Debug, Default, Clone, Copy)]
pub struct SurveyControl;

impl SurveyControl {
    pub const NAME: &'static str = "survey-control";
}

pub static SURVEY_CONTROL_INFO: PluginInfo = PluginInfo {
    name: SurveyControl::NAME,
    parameters: &[
        ParameterInfo {
            name: "question",
            pretty_name: "Question prompt text",
            kind: ParameterType::String,
            default: ParameterDefault::Required,
            description: "The question to be presented to the participant.",
        },
        ParameterInfo {
            name: "options",
            pretty_name: "List of responses",
            kind: ParameterType::Complex,
            default: ParameterDefault::Required,
            description: "Responses the participant can select as their answer.",
        },
        ParameterInfo {
            name: "correct_option",
            pretty_name: "Index of correct option",
            kind: ParameterType::Int,
            default: ParameterDefault::Required,
            description: "Index of the correct response in the list of responses. Indexed from 0.",
        },
        ParameterInfo {
            name: "display",
            pretty_name: "Option layout",
            kind: ParameterType::String,
            default: ParameterDefault::Text("dropdown"),
            description: "Either `dropdown` or `radio`.",
        },
        ParameterInfo {
            name: "option_keys",
            pretty_name: "Option keys",
            kind: ParameterType::Keys,
            default: ParameterDefault::None,
            description: "One key per option that selects it. Ignored if the count differs from the options.",
        },
        ParameterInfo {
            name: "submit_key",
            pretty_name: "Submit key",
            kind: ParameterType::Keys,
            default: ParameterDefault::None,
            description: "Key that presses the button.",
        },
        ParameterInfo {
            name: "button_text",
            pretty_name: "Button text",
            kind: ParameterType::String,
            default: ParameterDefault::Text("Submit"),
            description: "The text displayed on the button below the options.",
        },
        ParameterInfo {
            name: "continue_text",
            pretty_name: "Continue button text",
            kind: ParameterType::String,
            default: ParameterDefault::Text("Continue"),
            description: "The button text once feedback is shown.",
        },
        ParameterInfo {
            name: "feedback_correct",
            pretty_name: "Correct feedback text",
            kind: ParameterType::String,
            default: ParameterDefault::Required,
            description: "Feedback to be given for a correct answer.",
        },
        ParameterInfo {
            name: "feedback_incorrect",
            pretty_name: "Incorrect feedback text",
            kind: ParameterType::String,
            default: ParameterDefault::Required,
            description: "Feedback to be given for an incorrect answer.",
        },
        ParameterInfo {
            name: "feedback_function",
            pretty_name: "Feedback function",
            kind: ParameterType::Function,
            default: ParameterDefault::None,
            description: "Called once feedback has been given. Attached by the host at runtime.",
        },
        ParameterInfo {
            name: "instructions",
            pretty_name: "Instructions",
            kind: ParameterType::Html,
            default: ParameterDefault::None,
            description: "Trusted HTML shown below the options.",
        },
        ParameterInfo {
            name: "timeout_ms",
            pretty_name: "Timeout",
            kind: ParameterType::Int,
            default: ParameterDefault::None,
            description: "Milliseconds before the question is failed automatically.",
        },
    ],
};

impl<T: Timer + 'static> Plugin<T> for SurveyControl {
    fn info(&self) -> &'static PluginInfo {
        &SURVEY_CONTROL_INFO
    }

    fn create(&self, params: &Value, timer: T) -> Result<Box<dyn TrialWidget>, PluginError> {
        let config = WidgetConfig::deserialize(params).map_err(|source| {
            PluginError::InvalidParameters {
                plugin: Self::NAME,
                source,
            }
        })?;
        Ok(Box::new(ControlQuestion::new(config, timer)?))
    }
}

/// Plugins known to a host, built explicitly at wiring time.
pub struct PluginRegistry<T: Timer> {
    plugins: HashMap<&'static str, Box<dyn Plugin<T>>>,
}

impl<T: Timer> Default for PluginRegistry<T> {
    fn default() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }
}

impl<T: Timer> PluginRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: impl Plugin<T> + 'static) -> Result<(), PluginError> {
        let name = plugin.info().name;
        if self.plugins.contains_key(name) {
            return Err(PluginError::Duplicate(name));
        }
        debug!(name, "plugin registered");
        self.plugins.insert(name, Box::new(plugin));
        Ok(())
    }

    pub fn info(&self, name: &str) -> Option<&'static PluginInfo> {
        self.plugins.get(name).map(|p| p.info())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.keys().copied()
    }

    pub fn create(
        &self,
        name: &str,
        params: &Value,
        timer: T,
    ) -> Result<Box<dyn TrialWidget>, PluginError> {
        let plugin = self
            .plugins
            .get(name)
            .ok_or_else(|| PluginError::Unknown(name.to_string()))?;
        plugin.create(params, timer)
    }

    /// Instantiates a timeline entry, dispatching on its `type` field.
    pub fn create_entry(&self, entry: &Value, timer: T) -> Result<Box<dyn TrialWidget>, PluginError> {
        let name = entry
            .get("type")
            .and_then(Value::as_str)
            .ok_or(PluginError::MissingType)?;
        self.create(name, entry, timer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::WidgetState;
    use cogex_timing::ManualTimer;
    use serde_json::json;

    fn registry() -> PluginRegistry<ManualTimer> {
        let mut registry = PluginRegistry::new();
        registry.register(SurveyControl).unwrap();
        registry
    }

    fn entry() -> Value {
        json!({
            "type": "survey-control",
            "question": "2 + 2?",
            "options": ["3", "4", "5"],
            "correct_option": 1,
            "feedback_correct": "Right",
            "feedback_incorrect": "Wrong"
        })
    }

    #[test]
    fn registering_twice_fails() {
        let mut registry = registry();
        assert!(matches!(
            registry.register(SurveyControl),
            Err(PluginError::Duplicate("survey-control"))
        ));
        assert_eq!(registry.names().count(), 1);
    }

    #[test]
    fn creates_widget_from_timeline_entry() {
        let widget = registry().create_entry(&entry(), ManualTimer::new()).unwrap();
        assert_eq!(widget.state(), WidgetState::Rendering);
    }

    #[test]
    fn unknown_and_untyped_entries_fail() {
        let registry = registry();
        let mut untyped = entry();
        untyped.as_object_mut().unwrap().remove("type");
        assert!(matches!(
            registry.create_entry(&untyped, ManualTimer::new()),
            Err(PluginError::MissingType)
        ));
        assert!(matches!(
            registry.create("survey-text", &entry(), ManualTimer::new()),
            Err(PluginError::Unknown(name)) if name == "survey-text"
        ));
    }

    #[test]
    fn bad_parameters_and_bad_config_are_distinct_errors() {
        let registry = registry();
        let mut missing = entry();
        missing.as_object_mut().unwrap().remove("question");
        assert!(matches!(
            registry.create_entry(&missing, ManualTimer::new()),
            Err(PluginError::InvalidParameters { .. })
        ));

        let mut out_of_range = entry();
        out_of_range["correct_option"] = json!(7);
        assert!(matches!(
            registry.create_entry(&out_of_range, ManualTimer::new()),
            Err(PluginError::Config(ConfigError::CorrectOptionOutOfRange { index: 7, len: 3 }))
        ));
    }

    #[test]
    fn info_lists_required_parameters() {
        let info = registry().info(SurveyControl::NAME).unwrap();
        let required: Vec<_> = info.required().map(|p| p.name).collect();
        assert_eq!(
            required,
            vec!["question", "options", "correct_option", "feedback_correct", "feedback_incorrect"]
        );
        assert_eq!(
            info.parameter("button_text").map(|p| p.default),
            Some(ParameterDefault::Text("Submit"))
        );
    }
}
