pub mod alarm;
pub mod timer;

pub use alarm::{AlarmId, Alarms};
pub use timer::{HighPrecisionTimer, ManualTimer, Timer};
