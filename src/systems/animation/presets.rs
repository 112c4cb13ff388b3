use bevy::prelude::*;
use enum_map::{enum_map, Enum, EnumMap};
use serde::{Deserialize, Serialize};

use crate::data::WindowTimings;

use super::{Ease, Sequence, TrackKind, WindowVisual};

#[derive(Enum, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowAnimation {
    None,
    SlideUp,
    SlideDown,
    SlideLeft,
    #[default]
    SlideRight,
    ScaleUp,
}

#[derive(Enum, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HideAnimation {
    None,
    MoveDown,
    MoveUp,
    MoveLeft,
    #[default]
    MoveRight,
    ScaleDown,
}

impl ShowAnimation {
    pub fn direction(self) -> Option<Vec2> {
        match self {
            Self::SlideUp => Some(Vec2::Y),
            Self::SlideDown => Some(Vec2::NEG_Y),
            Self::SlideLeft => Some(Vec2::NEG_X),
            Self::SlideRight => Some(Vec2::X),
            Self::None | Self::ScaleUp => None,
        }
    }
}

impl HideAnimation {
    pub fn direction(self) -> Option<Vec2> {
        match self {
            Self::MoveUp => Some(Vec2::Y),
            Self::MoveDown => Some(Vec2::NEG_Y),
            Self::MoveLeft => Some(Vec2::NEG_X),
            Self::MoveRight => Some(Vec2::X),
            Self::None | Self::ScaleDown => None,
        }
    }
}

/// Point on the appear sequence at which the window counts as shown.
pub fn show_callback_times(timings: &WindowTimings) -> EnumMap<ShowAnimation, f32> {
    enum_map! {
        ShowAnimation::None => 0.0,
        ShowAnimation::ScaleUp => timings.show_fade_time,
        ShowAnimation::SlideDown => timings.show_move_time * 0.5,
        ShowAnimation::SlideUp
        | ShowAnimation::SlideLeft
        | ShowAnimation::SlideRight => timings.show_move_time,
    }
}

/// Builds the appear sequence. The visual is reset to the sequence's start
/// values; the sequence always ends at full opacity, unit scale and `home`.
pub fn appear<C: Copy>(
    animation: ShowAnimation,
    visual: &mut WindowVisual,
    home: Vec2,
    timings: &WindowTimings,
) -> Sequence<C> {
    match animation {
        ShowAnimation::ScaleUp => appear_scale_up(visual, home, timings),
        ShowAnimation::None => {
            *visual = WindowVisual::settled_at(home);
            Sequence::new()
        }
        slide => {
            let direction = slide.direction().unwrap_or(Vec2::X);
            appear_by_direction(visual, home, direction, timings)
        }
    }
}

/// Builds the disappear sequence, which always ends fully transparent.
pub fn disappear<C: Copy>(
    animation: HideAnimation,
    visual: &mut WindowVisual,
    timings: &WindowTimings,
) -> Sequence<C> {
    match animation {
        HideAnimation::ScaleDown => disappear_scale_down(visual, timings),
        HideAnimation::None => {
            let mut sequence = Sequence::new();
            sequence.append(
                TrackKind::Alpha {
                    from: visual.alpha,
                    to: 0.0,
                },
                0.0,
                Ease::Linear,
            );
            sequence
        }
        moving => {
            let direction = moving.direction().unwrap_or(Vec2::X);
            disappear_by_direction(visual, direction, timings)
        }
    }
}

fn appear_by_direction<C: Copy>(
    visual: &mut WindowVisual,
    home: Vec2,
    direction: Vec2,
    timings: &WindowTimings,
) -> Sequence<C> {
    let start = home + direction * timings.show_offset;
    *visual = WindowVisual {
        offset: start,
        scale: Vec2::ONE,
        alpha: 0.0,
    };

    let mut sequence = Sequence::new();
    sequence
        .append(
            TrackKind::Alpha { from: 0.0, to: 1.0 },
            timings.show_fade_time,
            Ease::OutQuad,
        )
        .insert(
            0.0,
            TrackKind::Offset {
                from: start,
                to: home,
            },
            timings.show_move_time,
            Ease::OutQuad,
        )
        .append(
            TrackKind::Shake {
                base: home,
                strength: -direction * timings.shake_force,
                vibrato: timings.shake_vibrato,
            },
            timings.show_shake_pos_time,
            Ease::Linear,
        )
        .append(
            TrackKind::Punch {
                base: Vec2::ONE,
                punch: direction * timings.show_scale_down,
                vibrato: timings.shake_vibrato,
            },
            timings.show_shake_scale_time,
            Ease::InOutBounce,
        );
    sequence
}

fn appear_scale_up<C: Copy>(
    visual: &mut WindowVisual,
    home: Vec2,
    timings: &WindowTimings,
) -> Sequence<C> {
    *visual = WindowVisual {
        offset: home,
        scale: Vec2::ZERO,
        alpha: 0.0,
    };

    let mut sequence = Sequence::new();
    sequence
        .append(
            TrackKind::Alpha { from: 0.0, to: 1.0 },
            timings.show_fade_time,
            Ease::OutQuad,
        )
        .insert(
            timings.show_scale_up_delay,
            TrackKind::Scale {
                from: Vec2::ZERO,
                to: Vec2::ONE,
            },
            timings.show_scale_up_time,
            Ease::OutQuad,
        );
    sequence
}

fn disappear_scale_down<C: Copy>(visual: &mut WindowVisual, timings: &WindowTimings) -> Sequence<C> {
    let overshoot = Vec2::splat(timings.hide_scale_up);

    let mut sequence = Sequence::new();
    sequence
        .append_interval(timings.hide_fade_delay)
        .append(
            TrackKind::Alpha {
                from: visual.alpha,
                to: 0.0,
            },
            timings.hide_fade_time,
            Ease::OutQuad,
        )
        .insert(
            0.0,
            TrackKind::Scale {
                from: visual.scale,
                to: overshoot,
            },
            timings.hide_scale_up_time,
            Ease::OutQuad,
        )
        .insert(
            timings.hide_scale_up_time,
            TrackKind::Scale {
                from: overshoot,
                to: Vec2::ZERO,
            },
            timings.hide_scale_down_time,
            Ease::OutQuad,
        );
    sequence
}

fn disappear_by_direction<C: Copy>(
    visual: &mut WindowVisual,
    direction: Vec2,
    timings: &WindowTimings,
) -> Sequence<C> {
    visual.scale = Vec2::ONE;
    let from = visual.offset;

    let mut sequence = Sequence::new();
    sequence
        .append(
            TrackKind::Alpha {
                from: visual.alpha,
                to: 0.0,
            },
            timings.hide_move_fade_time,
            Ease::OutQuad,
        )
        .insert(
            0.0,
            TrackKind::Offset {
                from,
                to: from + direction * timings.hide_offset,
            },
            timings.hide_move_fade_time,
            Ease::OutQuad,
        );
    sequence
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const ALL_SHOW: [ShowAnimation; 6] = [
        ShowAnimation::None,
        ShowAnimation::SlideUp,
        ShowAnimation::SlideDown,
        ShowAnimation::SlideLeft,
        ShowAnimation::SlideRight,
        ShowAnimation::ScaleUp,
    ];

    const ALL_HIDE: [HideAnimation; 6] = [
        HideAnimation::None,
        HideAnimation::MoveDown,
        HideAnimation::MoveUp,
        HideAnimation::MoveLeft,
        HideAnimation::MoveRight,
        HideAnimation::ScaleDown,
    ];

    #[test]
    fn every_appear_ends_settled_at_home_even_from_a_displaced_start() {
        let timings = WindowTimings::default();
        let home = Vec2::new(12.0, -30.0);
        for animation in ALL_SHOW {
            let mut visual = WindowVisual {
                offset: Vec2::new(3000.0, 0.0),
                scale: Vec2::splat(0.2),
                alpha: 0.0,
            };
            let mut sequence = appear::<()>(animation, &mut visual, home, &timings);
            sequence.advance(Duration::from_secs(10), &mut visual);

            assert!(visual.offset.distance(home) < 1e-3, "{animation:?} offset");
            assert!(visual.scale.distance(Vec2::ONE) < 1e-3, "{animation:?} scale");
            assert!((visual.alpha - 1.0).abs() < 1e-5, "{animation:?} alpha");
        }
    }

    #[test]
    fn every_disappear_ends_transparent() {
        let timings = WindowTimings::default();
        for animation in ALL_HIDE {
            let mut visual = WindowVisual::SETTLED;
            let mut sequence = disappear::<()>(animation, &mut visual, &timings);
            sequence.cancel(&mut visual);
            assert_eq!(visual.alpha, 0.0, "{animation:?}");
        }
    }

    #[test]
    fn slide_starts_off_screen_along_its_direction() {
        let timings = WindowTimings::default();
        let mut visual = WindowVisual::SETTLED;
        let _ = appear::<()>(ShowAnimation::SlideUp, &mut visual, Vec2::ZERO, &timings);

        assert_eq!(visual.offset, Vec2::new(0.0, timings.show_offset));
        assert_eq!(visual.alpha, 0.0);
    }

    #[test]
    fn scale_down_overshoots_before_collapsing() {
        let timings = WindowTimings::default();
        let mut visual = WindowVisual::SETTLED;
        let mut sequence = disappear::<()>(HideAnimation::ScaleDown, &mut visual, &timings);

        sequence.advance(
            Duration::from_secs_f32(timings.hide_scale_up_time),
            &mut visual,
        );
        assert!(visual.scale.x > 1.15);

        sequence.advance(Duration::from_secs(2), &mut visual);
        assert!(visual.scale.length() < 1e-3);
    }

    #[test]
    fn callback_times_follow_animation_kind() {
        let timings = WindowTimings::default();
        let times = show_callback_times(&timings);

        assert_eq!(times[ShowAnimation::None], 0.0);
        assert_eq!(times[ShowAnimation::ScaleUp], timings.show_fade_time);
        assert_eq!(times[ShowAnimation::SlideDown], timings.show_move_time * 0.5);
        assert_eq!(times[ShowAnimation::SlideLeft], timings.show_move_time);
    }
}
