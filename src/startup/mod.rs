use bevy::prelude::*;

use crate::systems::{
    audio::WindowAudioPlugin,
    controllers::ControllersPlugin,
    windows::{WindowSystem, WindowsPlugin},
};

pub mod paths;
pub mod shortcuts;

pub struct StartupPlugin;
impl Plugin for StartupPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((WindowsPlugin, WindowAudioPlugin, ControllersPlugin))
            .add_systems(Startup, spawn_camera)
            .add_systems(
                Update,
                shortcuts::open_windows_on_hotkeys.before(WindowSystem::Input),
            );
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((Camera2d, Msaa::Off));
}
