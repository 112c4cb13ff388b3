pub mod config;

pub use config::{BackgroundSettings, CanvasSettings, ConfigError, WindowConfig, WindowTimings};
