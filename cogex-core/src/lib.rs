pub mod config;
pub mod key;
pub mod trial;
pub mod view;

pub use config::{ConfigError, DisplayMode, WidgetConfig};
pub use key::KeyId;
pub use trial::{TrialResult, WidgetState};
pub use view::{instruction_lines, Button, Container, Control, Feedback, HitTarget, Tone, View};
