use std::time::Duration;

use crate::{
    data::BackgroundSettings,
    systems::animation::{Ease, Sequence, TrackKind, WindowVisual},
};

use super::defs::Rgba;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BackgroundCue {
    ShowComplete,
    HideComplete,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackgroundPhase {
    #[default]
    Idle,
    FadingIn,
    FadingOut,
}

/// The shared dimmer behind modal windows. Fades in and out after a short
/// delay; at most one fade runs at a time.
#[derive(Clone, Debug)]
pub struct WindowBackground {
    settings: BackgroundSettings,
    visual: WindowVisual,
    color: Rgba,
    active: bool,
    shown: bool,
    phase: BackgroundPhase,
    sequence: Option<Sequence<BackgroundCue>>,
    sorting_order: i32,
    override_sorting: bool,
}

impl WindowBackground {
    pub fn new(settings: BackgroundSettings) -> Self {
        Self {
            settings,
            visual: WindowVisual::TRANSPARENT,
            color: Rgba::DIMMER,
            active: false,
            shown: false,
            phase: BackgroundPhase::Idle,
            sequence: None,
            sorting_order: settings.sorting_order,
            override_sorting: false,
        }
    }

    pub fn settings(&self) -> &BackgroundSettings {
        &self.settings
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn phase(&self) -> BackgroundPhase {
        self.phase
    }

    pub fn alpha(&self) -> f32 {
        self.visual.alpha
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn sorting_order(&self) -> i32 {
        self.sorting_order
    }

    pub fn override_sorting(&self) -> bool {
        self.override_sorting
    }

    pub fn set_sorting(&mut self, order: i32, override_sorting: bool) {
        self.sorting_order = order;
        self.override_sorting = override_sorting;
    }

    /// Shows the dimmer with `color`. Already shown dimmers only take the
    /// new color.
    pub fn show(&mut self, force: bool, color: Rgba) {
        self.reset_tweener();
        self.color = color;
        if self.shown {
            return;
        }

        self.active = true;
        if force {
            self.visual.alpha = 1.0;
            self.shown = true;
            return;
        }

        let mut sequence = Sequence::new();
        sequence
            .insert(
                self.settings.wait_time,
                TrackKind::Alpha {
                    from: self.visual.alpha,
                    to: 1.0,
                },
                self.settings.fade_time,
                Ease::OutQuad,
            )
            .append_cue(BackgroundCue::ShowComplete);
        self.sequence = Some(sequence);
        self.phase = BackgroundPhase::FadingIn;
    }

    pub fn hide(&mut self, force: bool) {
        self.reset_tweener();
        if force {
            self.visual.alpha = 0.0;
            self.active = false;
            self.shown = false;
            return;
        }
        if !self.shown {
            return;
        }

        let mut sequence = Sequence::new();
        sequence
            .insert(
                self.settings.wait_time,
                TrackKind::Alpha {
                    from: self.visual.alpha,
                    to: 0.0,
                },
                self.settings.fade_time,
                Ease::OutQuad,
            )
            .append_cue(BackgroundCue::HideComplete);
        self.sequence = Some(sequence);
        self.shown = false;
        self.phase = BackgroundPhase::FadingOut;
    }

    /// Deactivates the dimmer without animation. With `with_state` the
    /// shown flag is cleared too, so the next `show` fades in again.
    pub fn resetup(&mut self, with_state: bool) {
        self.reset_tweener();
        self.active = false;
        if with_state {
            self.visual.alpha = 0.0;
            self.shown = false;
        }
    }

    pub fn advance(&mut self, delta: Duration) {
        let Some(sequence) = self.sequence.as_mut() else {
            return;
        };

        let cues = sequence.advance(delta, &mut self.visual);
        if sequence.is_finished() {
            self.sequence = None;
        }
        for cue in cues {
            self.complete(cue);
        }
    }

    fn complete(&mut self, cue: BackgroundCue) {
        match (cue, self.phase) {
            (BackgroundCue::ShowComplete, BackgroundPhase::FadingIn) => self.shown = true,
            (BackgroundCue::HideComplete, BackgroundPhase::FadingOut) => self.active = false,
            _ => return,
        }
        self.phase = BackgroundPhase::Idle;
    }

    fn reset_tweener(&mut self) {
        let Some(mut sequence) = self.sequence.take() else {
            return;
        };
        sequence.cancel(&mut self.visual);
        match self.phase {
            BackgroundPhase::FadingIn => self.shown = true,
            BackgroundPhase::FadingOut => self.active = false,
            BackgroundPhase::Idle => {}
        }
        self.phase = BackgroundPhase::Idle;
    }
}
