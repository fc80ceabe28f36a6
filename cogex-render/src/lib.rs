pub mod layout;
pub mod render;

pub use layout::{layout, Bounds, ItemKind, Layout, LayoutItem, MonospaceMeasure, TextMeasure};
pub use render::{load_font, FrameStats, SkiaRenderer};
