use bevy::prelude::*;

use super::defs::{WindowHandle, WindowKind, WindowState};

#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct WindowStateChanged {
    pub window: WindowHandle,
    pub kind: WindowKind,
    pub state: WindowState,
    pub forced: bool,
}

#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct WindowAppearing {
    pub window: WindowHandle,
    pub kind: WindowKind,
}

#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct WindowShown {
    pub window: WindowHandle,
    pub kind: WindowKind,
}

#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct WindowHiding {
    pub window: WindowHandle,
    pub kind: WindowKind,
}

#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct WindowHidden {
    pub window: WindowHandle,
    pub kind: WindowKind,
}

#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct WindowTopChanged {
    pub window: WindowHandle,
    pub kind: WindowKind,
}

/// "Play sound by name" request for whatever audio backend the host runs.
#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct WindowSoundRequest {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WindowNotification {
    StateChanged(WindowStateChanged),
    Appearing(WindowAppearing),
    Shown(WindowShown),
    Hiding(WindowHiding),
    Hidden(WindowHidden),
    TopChanged(WindowTopChanged),
}

impl WindowNotification {
    pub fn window(&self) -> WindowHandle {
        match self {
            Self::StateChanged(event) => event.window,
            Self::Appearing(event) => event.window,
            Self::Shown(event) => event.window,
            Self::Hiding(event) => event.window,
            Self::Hidden(event) => event.window,
            Self::TopChanged(event) => event.window,
        }
    }
}

/// Everything the window manager wants the presentation layer to act on,
/// drained once per frame.
#[derive(Clone, Debug, PartialEq)]
pub enum WindowOutput {
    Spawned {
        window: WindowHandle,
        kind: WindowKind,
    },
    Despawned(WindowHandle),
    Sound(String),
    Notification(WindowNotification),
}
