pub mod host;
pub mod markup;
pub mod plugin;
pub mod state;
pub mod trial;

pub use host::{EventOutcome, FeedbackHook, Host, ResultLog, TrialWidget, WidgetEvent};
pub use plugin::{
    ParameterDefault, ParameterInfo, ParameterType, Plugin, PluginError, PluginInfo,
    PluginRegistry, SurveyControl,
};
pub use state::{ControlQuestion, Rejection, SubmitOutcome};
pub use trial::{Trial, GRACE_PERIOD_MS};
