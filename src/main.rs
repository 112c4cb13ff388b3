use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use bevy::{log::LogPlugin, prelude::*};

use modal_stack::{
    data::WindowConfig,
    startup::StartupPlugin,
    systems::{
        controllers::{ControllerError, ControllerRegistry, StateController},
        events::EventBus,
        windows::WindowShown,
    },
};

const CONFIG_PATH: &str = "window_config.json";

fn main() {
    let config = load_config();

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: String::from("modal stack"),
                        ..default()
                    }),
                    ..default()
                })
                .set(LogPlugin {
                    filter: String::from("wgpu=error,naga=warn,modal_stack=debug"),
                    ..default()
                }),
        )
        .insert_resource(config)
        .add_plugins(StartupPlugin)
        .add_systems(Startup, register_window_stats)
        .run();
}

fn load_config() -> WindowConfig {
    if !Path::new(CONFIG_PATH).exists() {
        return WindowConfig::default();
    }
    WindowConfig::from_path(CONFIG_PATH).unwrap_or_else(|error| {
        eprintln!("ignoring {CONFIG_PATH}: {error}");
        WindowConfig::default()
    })
}

/// Counts windows that finished appearing and reports the tally now and then.
struct WindowStats {
    shown: Arc<AtomicUsize>,
    reported: usize,
}

impl StateController for WindowStats {
    fn rare_update(&mut self) -> Result<(), ControllerError> {
        let shown = self.shown.load(Ordering::Relaxed);
        if shown != self.reported {
            info!("{shown} window(s) shown so far");
            self.reported = shown;
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), ControllerError> {
        info!("session ended after {} shown window(s)", self.shown.load(Ordering::Relaxed));
        Ok(())
    }
}

fn register_window_stats(bus: Res<EventBus>, mut registry: ResMut<ControllerRegistry>) {
    let shown = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&shown);
    bus.subscribe::<WindowShown>(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    if let Err(error) = registry.register(WindowStats { shown, reported: 0 }) {
        error!("{error}");
    }
}
