use std::{fmt, time::Duration};

use bevy::prelude::*;

use crate::{
    data::WindowTimings,
    systems::animation::{presets, Sequence, WindowVisual},
};

use super::defs::{WindowHandle, WindowKind, WindowPayload, WindowSettings, WindowState};

pub type HiddenCallback = Box<dyn FnOnce(WindowHandle) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WindowCue {
    Shown,
    Hidden,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    StateChanged { state: WindowState, forced: bool },
    Appearing,
    Shown,
    Hiding,
    Hidden,
    PlaySound(String),
    /// Hidden-state exit actions ran; the instance must be released.
    Destroyed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerNotice {
    pub window: WindowHandle,
    pub kind: NoticeKind,
}

/// Lifecycle of one window: state machine, its single in-flight sequence
/// and the visual values that sequence drives.
pub struct WindowController {
    handle: WindowHandle,
    kind: WindowKind,
    settings: WindowSettings,
    payload: WindowPayload,
    state: WindowState,
    visual: WindowVisual,
    home: Vec2,
    sequence: Option<Sequence<WindowCue>>,
    visible: bool,
    interactable: bool,
    destroyed: bool,
    on_hidden: Option<HiddenCallback>,
}

impl fmt::Debug for WindowController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowController")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("visual", &self.visual)
            .field("visible", &self.visible)
            .field("interactable", &self.interactable)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl WindowController {
    pub fn new(
        handle: WindowHandle,
        kind: WindowKind,
        settings: WindowSettings,
        payload: WindowPayload,
    ) -> Self {
        Self {
            handle,
            kind,
            settings,
            payload,
            state: WindowState::Hidden,
            visual: WindowVisual::TRANSPARENT,
            home: Vec2::ZERO,
            sequence: None,
            visible: false,
            interactable: false,
            destroyed: false,
            on_hidden: None,
        }
    }

    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    pub fn kind(&self) -> &WindowKind {
        &self.kind
    }

    pub fn settings(&self) -> &WindowSettings {
        &self.settings
    }

    pub fn payload(&self) -> &WindowPayload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut WindowPayload {
        &mut self.payload
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn visual(&self) -> WindowVisual {
        self.visual
    }

    pub fn home(&self) -> Vec2 {
        self.home
    }

    pub fn set_home(&mut self, home: Vec2) {
        self.home = home;
        self.visual.offset = home;
    }

    pub fn is_visible(&self) -> bool {
        self.state == WindowState::Active
    }

    pub fn is_suspended(&self) -> bool {
        self.state == WindowState::Suspended
    }

    /// Whether the window's controls currently accept input.
    pub fn is_interactable(&self) -> bool {
        self.interactable
    }

    /// Whether the instance is shown at all (it may be fully transparent).
    pub fn is_active_object(&self) -> bool {
        self.visible && !self.destroyed
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn has_running_sequence(&self) -> bool {
        self.sequence.is_some()
    }

    pub fn set_on_hidden(&mut self, callback: impl FnOnce(WindowHandle) + Send + Sync + 'static) {
        self.on_hidden = Some(Box::new(callback));
    }

    pub fn take_on_hidden(&mut self) -> Option<HiddenCallback> {
        self.on_hidden.take()
    }

    pub fn show(&mut self, force: bool, timings: &WindowTimings, out: &mut Vec<ControllerNotice>) {
        if self.destroyed || (!self.state.can_show() && !force) {
            return;
        }

        self.change_state(WindowState::Appearing, force, out);
        self.reset_sequence();
        let mut sequence =
            presets::appear(self.settings.show_animation, &mut self.visual, self.home, timings);

        if force {
            sequence.finish(&mut self.visual);
            self.on_shown(out);
        } else {
            let at = presets::show_callback_times(timings)[self.settings.show_animation];
            sequence.insert_cue(at, WindowCue::Shown);
            self.sequence = Some(sequence);
        }
    }

    pub fn hide(&mut self, force: bool, timings: &WindowTimings, out: &mut Vec<ControllerNotice>) {
        if self.destroyed || (!self.state.can_hide() && !force) {
            return;
        }

        self.change_state(WindowState::Hiding, force, out);
        self.reset_sequence();
        if force {
            self.visual.alpha = 0.0;
            self.on_hidden(out);
        } else {
            let mut sequence =
                presets::disappear(self.settings.hide_animation, &mut self.visual, timings);
            sequence.append_cue(WindowCue::Hidden);
            self.sequence = Some(sequence);
        }
    }

    /// Covered by another window: plays the disappear animation but keeps
    /// the instance alive.
    pub fn suspend(&mut self, timings: &WindowTimings, out: &mut Vec<ControllerNotice>) {
        if self.destroyed {
            return;
        }
        self.change_state(WindowState::Suspended, false, out);
        self.reset_sequence();
        self.sequence = Some(presets::disappear(
            self.settings.hide_animation,
            &mut self.visual,
            timings,
        ));
    }

    pub fn wake_up(&mut self, timings: &WindowTimings, out: &mut Vec<ControllerNotice>) {
        if self.destroyed {
            return;
        }
        self.change_state(WindowState::Active, false, out);
        self.reset_sequence();
        self.sequence = Some(presets::appear(
            self.settings.show_animation,
            &mut self.visual,
            self.home,
            timings,
        ));
    }

    pub fn kill(&mut self, out: &mut Vec<ControllerNotice>) {
        if self.destroyed {
            return;
        }
        self.reset_sequence();
        self.change_state(WindowState::Hidden, true, out);
    }

    /// Tears the window down without any state notifications.
    pub fn kill_silently(&mut self, out: &mut Vec<ControllerNotice>) {
        if self.destroyed {
            return;
        }
        self.reset_sequence();
        self.state = WindowState::Hidden;
        self.process_hide(out);
    }

    pub fn advance(&mut self, delta: Duration, out: &mut Vec<ControllerNotice>) {
        let Some(sequence) = self.sequence.as_mut() else {
            return;
        };

        let cues = sequence.advance(delta, &mut self.visual);
        if sequence.is_finished() {
            self.sequence = None;
        }

        for cue in cues {
            match cue {
                WindowCue::Shown => self.on_shown(out),
                WindowCue::Hidden => self.on_hidden(out),
            }
        }
    }

    fn reset_sequence(&mut self) {
        if let Some(mut sequence) = self.sequence.take() {
            sequence.cancel(&mut self.visual);
        }
    }

    fn on_shown(&mut self, out: &mut Vec<ControllerNotice>) {
        if self.state == WindowState::Appearing {
            self.change_state(WindowState::Active, false, out);
        }
    }

    fn on_hidden(&mut self, out: &mut Vec<ControllerNotice>) {
        self.change_state(WindowState::Hidden, false, out);
    }

    fn change_state(&mut self, state: WindowState, forced: bool, out: &mut Vec<ControllerNotice>) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.interactable = state.is_interactable();

        match state {
            WindowState::Appearing => {
                self.visible = true;
                if let Some(sound) = self.settings.show_sound.clone().filter(|s| !s.is_empty()) {
                    self.notify(NoticeKind::PlaySound(sound), out);
                }
                self.notify(NoticeKind::Appearing, out);
            }
            WindowState::Active => self.notify(NoticeKind::Shown, out),
            WindowState::Hiding => {
                if let Some(sound) = self.settings.hide_sound.clone().filter(|s| !s.is_empty()) {
                    self.notify(NoticeKind::PlaySound(sound), out);
                }
                self.notify(NoticeKind::Hiding, out);
            }
            WindowState::Hidden => self.notify(NoticeKind::Hidden, out),
            WindowState::Suspended => {}
        }

        self.notify(NoticeKind::StateChanged { state, forced }, out);
        self.process_hide(out);
    }

    fn process_hide(&mut self, out: &mut Vec<ControllerNotice>) {
        if self.state != WindowState::Hidden {
            return;
        }
        self.sequence = None;
        self.visible = false;
        self.interactable = false;
        self.destroyed = true;
        self.notify(NoticeKind::Destroyed, out);
    }

    fn notify(&self, kind: NoticeKind, out: &mut Vec<ControllerNotice>) {
        out.push(ControllerNotice {
            window: self.handle,
            kind,
        });
    }
}
