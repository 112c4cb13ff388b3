use bevy::{ecs::system::SystemParam, prelude::*, window::PrimaryWindow};

use crate::{
    data::WindowConfig,
    startup::paths,
    systems::resources::{PreloadCursor, PreloadProgress},
};

mod background;
mod canvas;
mod controller;
mod defs;
mod events;
mod manager;
mod stack;

pub use background::{BackgroundPhase, WindowBackground};
pub use canvas::{CanvasHost, CanvasNode, LayerWarning};
pub use controller::{ControllerNotice, HiddenCallback, NoticeKind, WindowController};
pub use defs::{
    Rgba, WindowError, WindowHandle, WindowKind, WindowPayload, WindowSettings, WindowState,
    WindowTemplate,
};
pub use events::{
    WindowAppearing, WindowHidden, WindowHiding, WindowNotification, WindowOutput, WindowShown,
    WindowSoundRequest, WindowStateChanged, WindowTopChanged,
};
pub use manager::WindowManager;
pub use stack::WindowStack;

/* ─────────────────────────  PLUGIN  ───────────────────────── */

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum WindowSystem {
    Input,
    Tick,
    Present,
}

/// Runs the [`WindowManager`]: routes dismiss gestures, advances animations
/// from [`Time`], mirrors windows and the background into sprites and
/// forwards notifications as messages.
///
/// Uses an existing `WindowConfig` / `WindowManager` resource when one was
/// inserted before the plugin; otherwise builds them from defaults and the
/// bundled templates.
pub struct WindowsPlugin;
impl Plugin for WindowsPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<WindowConfig>()
            .cloned()
            .unwrap_or_default();
        if !app.world().contains_resource::<WindowManager>() {
            let cache = paths::bundled_cache();
            app.insert_resource(WindowManager::new(config.clone(), cache));
        }
        let bus = app
            .world()
            .get_resource::<WindowManager>()
            .map(|manager| manager.bus().clone())
            .unwrap_or_default();

        app.insert_resource(config)
            .insert_resource(bus)
            .add_message::<WindowStateChanged>()
            .add_message::<WindowAppearing>()
            .add_message::<WindowShown>()
            .add_message::<WindowHiding>()
            .add_message::<WindowHidden>()
            .add_message::<WindowTopChanged>()
            .add_message::<WindowSoundRequest>()
            .configure_sets(
                Update,
                (
                    WindowSystem::Input,
                    WindowSystem::Tick.after(WindowSystem::Input),
                    WindowSystem::Present.after(WindowSystem::Tick),
                ),
            )
            .add_systems(
                Startup,
                (initialize_window_manager, ensure_background_entity).chain(),
            )
            .add_systems(Update, route_dismiss_gestures.in_set(WindowSystem::Input))
            .add_systems(
                Update,
                (preload_window_templates, tick_window_manager)
                    .chain()
                    .in_set(WindowSystem::Tick),
            )
            .add_systems(
                Update,
                (apply_window_output, sync_window_visuals, sync_background_visual)
                    .chain()
                    .in_set(WindowSystem::Present),
            );
    }
}

/* ─────────────────────────  COMPONENTS  ───────────────────────── */

/// The entity mirroring one live window.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct WindowRoot {
    pub window: WindowHandle,
    pub kind: WindowKind,
}

/// Whether the window's controls accept input this frame.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowControls {
    pub interactable: bool,
}

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct WindowBackgroundRoot;

#[derive(SystemParam)]
struct WindowMessageWriters<'w> {
    state_changed: MessageWriter<'w, WindowStateChanged>,
    appearing: MessageWriter<'w, WindowAppearing>,
    shown: MessageWriter<'w, WindowShown>,
    hiding: MessageWriter<'w, WindowHiding>,
    hidden: MessageWriter<'w, WindowHidden>,
    top_changed: MessageWriter<'w, WindowTopChanged>,
    sounds: MessageWriter<'w, WindowSoundRequest>,
}

impl WindowMessageWriters<'_> {
    fn forward(&mut self, notification: WindowNotification) {
        match notification {
            WindowNotification::StateChanged(event) => {
                self.state_changed.write(event);
            }
            WindowNotification::Appearing(event) => {
                self.appearing.write(event);
            }
            WindowNotification::Shown(event) => {
                self.shown.write(event);
            }
            WindowNotification::Hiding(event) => {
                self.hiding.write(event);
            }
            WindowNotification::Hidden(event) => {
                self.hidden.write(event);
            }
            WindowNotification::TopChanged(event) => {
                self.top_changed.write(event);
            }
        }
    }
}

/* ─────────────────────────  SYSTEMS  ───────────────────────── */

fn initialize_window_manager(mut manager: ResMut<WindowManager>) {
    if let Err(error) = manager.initialize() {
        error!("window manager started without a background: {error}");
    }
}

fn ensure_background_entity(
    mut commands: Commands,
    manager: Res<WindowManager>,
    existing: Query<(), With<WindowBackgroundRoot>>,
) {
    let Some(background) = manager.background() else {
        return;
    };
    if !existing.is_empty() {
        return;
    }

    let size = manager.config().canvas.reference_size();
    commands.spawn((
        Name::new("window_background"),
        WindowBackgroundRoot,
        Sprite::from_color(background.color().to_color(), size),
        Transform::from_xyz(0.0, 0.0, manager.canvas().render_depth(CanvasNode::Background, 0)),
        Visibility::Hidden,
    ));
}

fn route_dismiss_gestures(
    keys: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    primary_window: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    mut manager: ResMut<WindowManager>,
) {
    if keys.just_pressed(KeyCode::Escape) {
        manager.on_back_navigation();
    }

    if !mouse.just_pressed(MouseButton::Left)
        || !manager.background().is_some_and(WindowBackground::is_active)
    {
        return;
    }
    let Some(top) = manager.current_window().and_then(|top| manager.controller(top)) else {
        return;
    };
    let Some(cursor) = primary_window
        .single()
        .ok()
        .and_then(|window| window.cursor_position())
    else {
        return;
    };
    let Some(point) = cameras.iter().find_map(|(camera, camera_transform)| {
        camera.viewport_to_world_2d(camera_transform, cursor).ok()
    }) else {
        return;
    };

    let visual = top.visual();
    let bounds = Rect::from_center_size(visual.offset, top.settings().size() * visual.scale);
    if !bounds.contains(point) {
        manager.on_background_click();
    }
}

fn preload_window_templates(
    mut manager: ResMut<WindowManager>,
    mut cursor: Local<PreloadCursor>,
    mut done: Local<bool>,
) {
    if *done {
        return;
    }
    if manager.cache_mut().preload_step(&mut cursor) == PreloadProgress::Complete {
        let cache = manager.cache();
        info!(
            "window templates preloaded: {}/{}",
            cache.loaded_count(),
            cache.len()
        );
        *done = true;
    }
}

fn tick_window_manager(time: Res<Time>, mut manager: ResMut<WindowManager>) {
    manager.tick(time.delta());
}

fn apply_window_output(
    mut commands: Commands,
    mut manager: ResMut<WindowManager>,
    roots: Query<(Entity, &WindowRoot)>,
    mut writers: WindowMessageWriters,
) {
    for output in manager.take_output() {
        match output {
            WindowOutput::Spawned { window, kind } => {
                let Some(controller) = manager.controller(window) else {
                    continue;
                };
                let settings = controller.settings();
                let depth = manager
                    .canvas()
                    .render_depth(CanvasNode::Window(window), settings.order());
                commands.spawn((
                    Name::new(format!("window:{kind}")),
                    WindowRoot { window, kind },
                    WindowControls::default(),
                    Sprite::from_color(settings.panel_color.to_color(), settings.size()),
                    Transform::from_translation(controller.visual().offset.extend(depth)),
                    Visibility::Hidden,
                ));
            }
            WindowOutput::Despawned(window) => {
                for (entity, root) in &roots {
                    if root.window == window {
                        commands.entity(entity).despawn();
                    }
                }
            }
            WindowOutput::Sound(name) => {
                writers.sounds.write(WindowSoundRequest { name });
            }
            WindowOutput::Notification(notification) => writers.forward(notification),
        }
    }
}

fn sync_window_visuals(
    manager: Res<WindowManager>,
    mut roots: Query<(
        &WindowRoot,
        &mut Transform,
        &mut Sprite,
        &mut Visibility,
        &mut WindowControls,
    )>,
) {
    for (root, mut transform, mut sprite, mut visibility, mut controls) in &mut roots {
        let Some(controller) = manager.controller(root.window) else {
            continue;
        };
        let visual = controller.visual();
        let settings = controller.settings();
        let depth = manager
            .canvas()
            .render_depth(CanvasNode::Window(root.window), settings.order());

        transform.translation = visual.offset.extend(depth);
        transform.scale = visual.scale.extend(1.0);
        sprite.color = settings
            .panel_color
            .to_color()
            .with_alpha(settings.panel_color.a * visual.alpha);
        *visibility = if controller.is_active_object() {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        controls.interactable = controller.is_interactable();
    }
}

fn sync_background_visual(
    manager: Res<WindowManager>,
    mut backgrounds: Query<
        (&mut Transform, &mut Sprite, &mut Visibility),
        With<WindowBackgroundRoot>,
    >,
) {
    let Some(background) = manager.background() else {
        return;
    };
    for (mut transform, mut sprite, mut visibility) in &mut backgrounds {
        let color = background.color();
        transform.translation.z = manager
            .canvas()
            .render_depth(CanvasNode::Background, background.sorting_order());
        sprite.color = color.to_color().with_alpha(color.a * background.alpha());
        *visibility = if background.is_active() {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
    }
}
