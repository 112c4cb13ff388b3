use std::{fs, path::Path, time::Duration};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read window config `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse window config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunable constants for the window layer. Every field has a default, so a
/// JSON override only needs to name the values it changes.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub timings: WindowTimings,
    pub canvas: CanvasSettings,
    pub background: BackgroundSettings,
    pub rare_update_interval_secs: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            timings: WindowTimings::default(),
            canvas: CanvasSettings::default(),
            background: BackgroundSettings::default(),
            rare_update_interval_secs: 1.0,
        }
    }
}

impl WindowConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn rare_update_interval(&self) -> Duration {
        Duration::from_secs_f32(self.rare_update_interval_secs.max(0.01))
    }
}

/// Durations are in seconds, distances in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowTimings {
    pub show_fade_time: f32,
    pub show_move_time: f32,
    pub show_offset: f32,
    pub show_shake_pos_time: f32,
    pub show_shake_scale_time: f32,
    pub show_scale_down: f32,
    pub show_scale_up_delay: f32,
    pub show_scale_up_time: f32,
    pub shake_force: f32,
    pub shake_vibrato: u32,
    pub hide_fade_delay: f32,
    pub hide_fade_time: f32,
    pub hide_scale_up: f32,
    pub hide_scale_up_time: f32,
    pub hide_scale_down_time: f32,
    pub hide_move_fade_time: f32,
    pub hide_offset: f32,
}

impl Default for WindowTimings {
    fn default() -> Self {
        Self {
            show_fade_time: 0.3,
            show_move_time: 0.5,
            show_offset: 3000.0,
            show_shake_pos_time: 0.35,
            show_shake_scale_time: 1.5,
            show_scale_down: 0.015,
            show_scale_up_delay: 0.1,
            show_scale_up_time: 0.35,
            shake_force: 200.0,
            shake_vibrato: 5,
            hide_fade_delay: 0.15,
            hide_fade_time: 0.25,
            hide_scale_up: 1.2,
            hide_scale_up_time: 0.07,
            hide_scale_down_time: 0.35,
            hide_move_fade_time: 1.0,
            hide_offset: 3000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub sorting_layer: String,
    pub sorting_order: i32,
    pub reference_resolution: [f32; 2],
    pub base_depth: f32,
    pub order_depth_step: f32,
    pub sibling_depth_step: f32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            sorting_layer: String::from("UI"),
            sorting_order: 1,
            reference_resolution: [1920.0, 1080.0],
            base_depth: 100.0,
            order_depth_step: 10.0,
            sibling_depth_step: 0.5,
        }
    }
}

impl CanvasSettings {
    pub fn reference_size(&self) -> Vec2 {
        Vec2::from(self.reference_resolution)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundSettings {
    pub wait_time: f32,
    pub fade_time: f32,
    pub sorting_order: i32,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            wait_time: 0.15,
            fade_time: 0.5,
            sorting_order: 0,
        }
    }
}
