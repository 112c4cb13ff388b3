use bevy::prelude::*;

use crate::{startup::paths, systems::windows::WindowManager};

/// Digit keys open the bundled windows; `H` dismisses everything that may be
/// dismissed.
pub fn open_windows_on_hotkeys(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    mut manager: ResMut<WindowManager>,
) {
    let hotkeys = [
        (KeyCode::Digit1, paths::SETTINGS),
        (KeyCode::Digit2, paths::MAP),
        (KeyCode::Digit3, paths::PAUSE),
        (KeyCode::Digit4, paths::LOSE),
        (KeyCode::Digit5, paths::WIN),
        (KeyCode::Digit6, paths::ABOUT),
    ];
    for (key, kind) in hotkeys {
        if keyboard_input.just_pressed(key) {
            manager.open(kind);
        }
    }

    if keyboard_input.just_pressed(KeyCode::KeyH) {
        let hidden = manager.hide_all_dismissable(|| debug!("dismissable windows hidden"));
        info!("hiding {hidden} window(s)");
    }
}
