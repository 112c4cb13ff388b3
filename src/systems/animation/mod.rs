//! Timed interpolation sequences over a window's visual state.
//!
//! A [`Sequence`] is a finite list of tracks (each interpolating one channel
//! of a [`WindowVisual`] between fixed values) plus cues that fire once the
//! sequence clock passes their offset. Sequences never outlive their owner:
//! [`Sequence::cancel`] snaps every track to its terminal value and drops the
//! pending cues, [`Sequence::finish`] does the same but hands the cues back.
use std::{f32::consts::PI, time::Duration};

use bevy::prelude::*;
use smallvec::SmallVec;

pub mod presets;

pub use presets::{HideAnimation, ShowAnimation};

pub type FiredCues<C> = SmallVec<[C; 2]>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowVisual {
    pub offset: Vec2,
    pub scale: Vec2,
    pub alpha: f32,
}

impl WindowVisual {
    pub const SETTLED: Self = Self {
        offset: Vec2::ZERO,
        scale: Vec2::ONE,
        alpha: 1.0,
    };

    pub const TRANSPARENT: Self = Self {
        offset: Vec2::ZERO,
        scale: Vec2::ONE,
        alpha: 0.0,
    };

    pub fn settled_at(home: Vec2) -> Self {
        Self {
            offset: home,
            ..Self::SETTLED
        }
    }
}

impl Default for WindowVisual {
    fn default() -> Self {
        Self::SETTLED
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Ease {
    Linear,
    #[default]
    OutQuad,
    InOutBounce,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutBounce => {
                if t < 0.5 {
                    (1.0 - out_bounce(1.0 - 2.0 * t)) * 0.5
                } else {
                    (1.0 + out_bounce(2.0 * t - 1.0)) * 0.5
                }
            }
        }
    }
}

fn out_bounce(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// What a track writes into the visual.
///
/// `Shake` and `Punch` oscillate around `base` with a linearly decaying
/// envelope, so both end exactly on `base`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackKind {
    Alpha { from: f32, to: f32 },
    Offset { from: Vec2, to: Vec2 },
    Scale { from: Vec2, to: Vec2 },
    Shake { base: Vec2, strength: Vec2, vibrato: u32 },
    Punch { base: Vec2, punch: Vec2, vibrato: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Track {
    start: f32,
    duration: f32,
    kind: TrackKind,
    ease: Ease,
}

impl Track {
    fn end(&self) -> f32 {
        self.start + self.duration
    }

    fn progress(&self, elapsed: f32) -> f32 {
        if self.duration <= f32::EPSILON {
            1.0
        } else {
            ((elapsed - self.start) / self.duration).clamp(0.0, 1.0)
        }
    }

    fn sample(&self, progress: f32, visual: &mut WindowVisual) {
        let eased = self.ease.apply(progress);
        match self.kind {
            TrackKind::Alpha { from, to } => visual.alpha = from + (to - from) * eased,
            TrackKind::Offset { from, to } => visual.offset = from.lerp(to, eased),
            TrackKind::Scale { from, to } => visual.scale = from.lerp(to, eased),
            TrackKind::Shake {
                base,
                strength,
                vibrato,
            } => {
                let envelope = 1.0 - eased;
                let wave = (eased * vibrato as f32 * 2.0 * PI).sin();
                visual.offset = base + strength * wave * envelope;
            }
            TrackKind::Punch {
                base,
                punch,
                vibrato,
            } => {
                let envelope = 1.0 - eased;
                let wave = (eased * vibrato as f32 * PI).sin();
                visual.scale = base + punch * wave * envelope;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Cue<C> {
    at: f32,
    cue: C,
    fired: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sequence<C> {
    tracks: Vec<Track>,
    cues: Vec<Cue<C>>,
    length: f32,
    elapsed: f32,
    finished: bool,
}

impl<C> Default for Sequence<C> {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            cues: Vec::new(),
            length: 0.0,
            elapsed: 0.0,
            finished: false,
        }
    }
}

impl<C: Copy> Sequence<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a track right after everything currently in the sequence.
    pub fn append(&mut self, kind: TrackKind, duration: f32, ease: Ease) -> &mut Self {
        let start = self.length;
        self.insert(start, kind, duration, ease)
    }

    pub fn insert(&mut self, at: f32, kind: TrackKind, duration: f32, ease: Ease) -> &mut Self {
        let track = Track {
            start: at.max(0.0),
            duration: duration.max(0.0),
            kind,
            ease,
        };
        self.length = self.length.max(track.end());
        // Stable on equal starts, so later insertions win when channels overlap.
        let index = self.tracks.partition_point(|existing| existing.start <= track.start);
        self.tracks.insert(index, track);
        self
    }

    pub fn append_interval(&mut self, duration: f32) -> &mut Self {
        self.length += duration.max(0.0);
        self
    }

    pub fn insert_cue(&mut self, at: f32, cue: C) -> &mut Self {
        let at = at.max(0.0);
        self.length = self.length.max(at);
        let index = self.cues.partition_point(|existing| existing.at <= at);
        self.cues.insert(
            index,
            Cue {
                at,
                cue,
                fired: false,
            },
        );
        self
    }

    pub fn append_cue(&mut self, cue: C) -> &mut Self {
        let at = self.length;
        self.insert_cue(at, cue)
    }

    pub fn duration(&self) -> f32 {
        self.length
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn advance(&mut self, delta: Duration, visual: &mut WindowVisual) -> FiredCues<C> {
        if self.finished {
            return FiredCues::new();
        }

        self.elapsed = (self.elapsed + delta.as_secs_f32()).min(self.length);
        self.apply_tracks(visual);
        let elapsed = self.elapsed;
        let fired = self.collect_cues(|cue| cue.at <= elapsed);
        if self.elapsed >= self.length {
            self.finished = true;
        }
        fired
    }

    /// Jumps to the end, applying terminal values and returning every cue
    /// that had not fired yet.
    pub fn finish(&mut self, visual: &mut WindowVisual) -> FiredCues<C> {
        if self.finished {
            return FiredCues::new();
        }
        self.elapsed = self.length;
        self.apply_tracks(visual);
        self.finished = true;
        self.collect_cues(|_| true)
    }

    /// Jumps to the end like [`Sequence::finish`] but discards pending cues.
    /// A cancelled sequence cannot be restarted.
    pub fn cancel(&mut self, visual: &mut WindowVisual) {
        if self.finished {
            return;
        }
        self.elapsed = self.length;
        self.apply_tracks(visual);
        for cue in &mut self.cues {
            cue.fired = true;
        }
        self.finished = true;
    }

    fn apply_tracks(&self, visual: &mut WindowVisual) {
        for track in &self.tracks {
            if self.elapsed < track.start {
                continue;
            }
            track.sample(track.progress(self.elapsed), visual);
        }
    }

    fn collect_cues(&mut self, due: impl Fn(&Cue<C>) -> bool) -> FiredCues<C> {
        let mut fired = FiredCues::new();
        for cue in &mut self.cues {
            if !cue.fired && due(cue) {
                cue.fired = true;
                fired.push(cue.cue);
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum TestCue {
        Half,
        End,
    }

    fn secs(value: f32) -> Duration {
        Duration::from_secs_f32(value)
    }

    #[test]
    fn append_chains_after_current_length() {
        let mut sequence = Sequence::<TestCue>::new();
        sequence
            .append(TrackKind::Alpha { from: 0.0, to: 1.0 }, 0.3, Ease::Linear)
            .insert(
                0.0,
                TrackKind::Offset {
                    from: Vec2::X * 100.0,
                    to: Vec2::ZERO,
                },
                0.5,
                Ease::Linear,
            )
            .append(
                TrackKind::Scale {
                    from: Vec2::ONE,
                    to: Vec2::splat(2.0),
                },
                0.25,
                Ease::Linear,
            );

        assert!((sequence.duration() - 0.75).abs() < 1e-5);
    }

    #[test]
    fn advance_interpolates_and_fires_cues_in_order() {
        let mut visual = WindowVisual::TRANSPARENT;
        let mut sequence = Sequence::new();
        sequence
            .append(TrackKind::Alpha { from: 0.0, to: 1.0 }, 1.0, Ease::Linear)
            .insert_cue(0.5, TestCue::Half)
            .append_cue(TestCue::End);

        let fired = sequence.advance(secs(0.25), &mut visual);
        assert!(fired.is_empty());
        assert!((visual.alpha - 0.25).abs() < 1e-4);

        let fired = sequence.advance(secs(0.5), &mut visual);
        assert_eq!(fired.as_slice(), &[TestCue::Half]);
        assert!(!sequence.is_finished());

        let fired = sequence.advance(secs(1.0), &mut visual);
        assert_eq!(fired.as_slice(), &[TestCue::End]);
        assert!(sequence.is_finished());
        assert_eq!(visual.alpha, 1.0);
    }

    #[test]
    fn cancel_applies_terminal_values_without_cues() {
        let mut visual = WindowVisual::SETTLED;
        let mut sequence = Sequence::new();
        sequence
            .append(TrackKind::Alpha { from: 1.0, to: 0.0 }, 1.0, Ease::OutQuad)
            .insert(
                0.0,
                TrackKind::Offset {
                    from: Vec2::ZERO,
                    to: Vec2::new(0.0, -300.0),
                },
                1.0,
                Ease::OutQuad,
            )
            .append_cue(TestCue::End);

        sequence.advance(secs(0.1), &mut visual);
        sequence.cancel(&mut visual);

        assert!(sequence.is_finished());
        assert_eq!(visual.alpha, 0.0);
        assert_eq!(visual.offset, Vec2::new(0.0, -300.0));
        assert!(sequence.advance(secs(5.0), &mut visual).is_empty());
        assert!(sequence.finish(&mut visual).is_empty());
    }

    #[test]
    fn finish_returns_every_unfired_cue() {
        let mut visual = WindowVisual::SETTLED;
        let mut sequence = Sequence::new();
        sequence
            .append_interval(2.0)
            .insert_cue(0.1, TestCue::Half)
            .append_cue(TestCue::End);

        let fired = sequence.advance(secs(0.2), &mut visual);
        assert_eq!(fired.as_slice(), &[TestCue::Half]);

        let fired = sequence.finish(&mut visual);
        assert_eq!(fired.as_slice(), &[TestCue::End]);
    }

    #[test]
    fn oscillating_tracks_settle_on_their_base() {
        let base = Vec2::new(10.0, -4.0);
        let mut visual = WindowVisual::settled_at(base);
        let mut sequence = Sequence::<TestCue>::new();
        sequence
            .append(
                TrackKind::Shake {
                    base,
                    strength: Vec2::new(-200.0, 0.0),
                    vibrato: 5,
                },
                0.35,
                Ease::Linear,
            )
            .append(
                TrackKind::Punch {
                    base: Vec2::ONE,
                    punch: Vec2::new(0.015, 0.0),
                    vibrato: 5,
                },
                1.5,
                Ease::InOutBounce,
            );

        sequence.advance(secs(0.1), &mut visual);
        assert_ne!(visual.offset, base);

        sequence.advance(secs(10.0), &mut visual);
        assert!(visual.offset.distance(base) < 1e-3);
        assert!(visual.scale.distance(Vec2::ONE) < 1e-3);
    }

    #[test]
    fn zero_length_sequence_fires_on_first_advance() {
        let mut visual = WindowVisual::SETTLED;
        let mut sequence = Sequence::new();
        sequence.insert_cue(0.0, TestCue::End);

        let fired = sequence.advance(Duration::ZERO, &mut visual);
        assert_eq!(fired.as_slice(), &[TestCue::End]);
        assert!(sequence.is_finished());
    }

    #[test]
    fn eases_hit_their_endpoints() {
        for ease in [Ease::Linear, Ease::OutQuad, Ease::InOutBounce] {
            assert!(ease.apply(0.0).abs() < 1e-5, "{ease:?} start");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-5, "{ease:?} end");
        }
    }
}
