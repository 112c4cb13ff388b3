use bevy::{
    audio::{PlaybackMode, Volume},
    prelude::*,
};

use crate::systems::windows::{WindowSoundRequest, WindowSystem};

/// Where window sounds live: `<directory>/<name>.<extension>`.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct WindowAudioConfig {
    pub directory: String,
    pub extension: String,
    pub volume: f32,
}

impl Default for WindowAudioConfig {
    fn default() -> Self {
        Self {
            directory: String::from("audio/ui"),
            extension: String::from("ogg"),
            volume: 0.5,
        }
    }
}

impl WindowAudioConfig {
    pub fn path_for(&self, name: &str) -> String {
        format!("{}/{name}.{}", self.directory, self.extension)
    }
}

#[derive(Component)]
pub struct WindowSound;

/// Plays [`WindowSoundRequest`]s once each through the asset server.
pub struct WindowAudioPlugin;
impl Plugin for WindowAudioPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WindowAudioConfig>()
            .add_systems(Update, play_window_sounds.after(WindowSystem::Present));
    }
}

fn play_window_sounds(
    mut commands: Commands,
    mut requests: MessageReader<WindowSoundRequest>,
    asset_server: Res<AssetServer>,
    config: Res<WindowAudioConfig>,
) {
    for request in requests.read() {
        commands.spawn((
            WindowSound,
            AudioPlayer::<AudioSource>(asset_server.load(config.path_for(&request.name))),
            PlaybackSettings {
                mode: PlaybackMode::Despawn,
                volume: Volume::Linear(config.volume),
                ..default()
            },
        ));
    }
}
