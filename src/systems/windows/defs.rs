use std::{borrow::Cow, fmt};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    data::BackgroundSettings,
    systems::{
        animation::{HideAnimation, ShowAnimation},
        resources::CacheError,
    },
};

/// Identity of one live window instance. Handles are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowHandle(u64);

impl WindowHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Type tag of a window ("settings", "pause", ...). One live instance per
/// kind at a time.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowKind(Cow<'static, str>);

impl WindowKind {
    pub const BACKGROUND: Self = Self(Cow::Borrowed("window_background"));

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for WindowKind {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowState {
    #[default]
    Hidden,
    Appearing,
    Active,
    Hiding,
    Suspended,
}

impl WindowState {
    pub const fn is_interactable(self) -> bool {
        matches!(self, Self::Active | Self::Appearing)
    }

    pub const fn can_show(self) -> bool {
        matches!(self, Self::Hidden | Self::Suspended)
    }

    pub const fn can_hide(self) -> bool {
        matches!(self, Self::Appearing | Self::Active)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const DIMMER: Self = Self::new(0.0, 0.0, 0.07, 0.6);
    pub const PANEL: Self = Self::new(0.1, 0.1, 0.12, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_color(self) -> Color {
        Color::srgba(self.r, self.g, self.b, self.a)
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::DIMMER
    }
}

/// The controller section of a window template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub show_animation: ShowAnimation,
    pub hide_animation: HideAnimation,
    pub hide_by_misclick: bool,
    pub with_background: bool,
    pub sorting_order: Option<i32>,
    pub max_order_in_layer: i32,
    pub background_color: Rgba,
    pub show_sound: Option<String>,
    pub hide_sound: Option<String>,
    pub size: [f32; 2],
    pub panel_color: Rgba,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            show_animation: ShowAnimation::SlideRight,
            hide_animation: HideAnimation::MoveRight,
            hide_by_misclick: false,
            with_background: true,
            sorting_order: None,
            max_order_in_layer: 0,
            background_color: Rgba::DIMMER,
            show_sound: None,
            hide_sound: None,
            size: [640.0, 360.0],
            panel_color: Rgba::PANEL,
        }
    }
}

impl WindowSettings {
    pub fn order(&self) -> i32 {
        self.sorting_order.unwrap_or(0)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::from(self.size)
    }
}

/// Caller-facing data of a window, handed to open initializers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowPayload(Map<String, Value>);

impl WindowPayload {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A loadable window description. Window templates need `controller` and
/// `payload`; the background template needs `background`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowTemplate {
    #[serde(default)]
    pub controller: Option<WindowSettings>,
    #[serde(default)]
    pub payload: Option<WindowPayload>,
    #[serde(default)]
    pub background: Option<BackgroundSettings>,
}

impl WindowTemplate {
    pub fn window(settings: WindowSettings) -> Self {
        Self {
            controller: Some(settings),
            payload: Some(WindowPayload::default()),
            background: None,
        }
    }

    pub fn background(settings: BackgroundSettings) -> Self {
        Self {
            controller: None,
            payload: None,
            background: Some(settings),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("template for `{0}` could not be loaded")]
    TemplateUnavailable(WindowKind),
    #[error("template for `{kind}` has no `{component}` section")]
    MissingComponent {
        kind: WindowKind,
        component: &'static str,
    },
    #[error("a `{0}` window is already open")]
    AlreadyOpen(WindowKind),
    #[error("{0} is not a live window")]
    UnknownWindow(WindowHandle),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interactable_states_are_appearing_and_active() {
        let interactable: Vec<_> = [
            WindowState::Hidden,
            WindowState::Appearing,
            WindowState::Active,
            WindowState::Hiding,
            WindowState::Suspended,
        ]
        .into_iter()
        .filter(|state| state.is_interactable())
        .collect();

        assert_eq!(interactable, vec![WindowState::Appearing, WindowState::Active]);
    }

    #[test]
    fn template_sections_are_optional_in_json() {
        let template: WindowTemplate = serde_json::from_str(
            r#"{ "controller": { "show_animation": "scale_up", "hide_by_misclick": true } }"#,
        )
        .expect("template should parse");

        let settings = template.controller.expect("controller section");
        assert_eq!(settings.show_animation, ShowAnimation::ScaleUp);
        assert_eq!(settings.hide_animation, HideAnimation::MoveRight);
        assert!(settings.hide_by_misclick);
        assert!(settings.with_background);
        assert!(template.payload.is_none());
    }

    #[test]
    fn payload_round_trips_values() {
        let mut payload = WindowPayload::default();
        payload.set("title", "Paused");
        payload.set("level", 3);

        assert_eq!(payload.get_str("title"), Some("Paused"));
        assert_eq!(payload.get("level").and_then(Value::as_i64), Some(3));
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn kinds_compare_by_name() {
        assert_eq!(WindowKind::from("pause"), WindowKind::new(String::from("pause")));
        assert_eq!(WindowKind::BACKGROUND.as_str(), "window_background");
    }
}
