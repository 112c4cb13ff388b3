use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt,
    time::Duration,
};

use bevy::prelude::*;
use thiserror::Error;

use crate::data::{ConfigError, WindowConfig};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ControllerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("an instance of `{0}` is already registered")]
    DuplicateInstance(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    Init,
    PostInit,
    Load,
    PostLoad,
    Save,
    Update,
    LateUpdate,
    RareUpdate,
    Reset,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::PostInit => "post_init",
            Self::Load => "load",
            Self::PostLoad => "post_load",
            Self::Save => "save",
            Self::Update => "update",
            Self::LateUpdate => "late_update",
            Self::RareUpdate => "rare_update",
            Self::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// A game-wide service with one instance per type. Every hook defaults to a
/// no-op; the registry decides when they run.
pub trait StateController: Any + Send + Sync {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    fn init(&mut self) -> Result<(), ControllerError> {
        Ok(())
    }

    fn post_init(&mut self) -> Result<(), ControllerError> {
        Ok(())
    }

    fn load(&mut self) -> Result<(), ControllerError> {
        Ok(())
    }

    fn post_load(&mut self) -> Result<(), ControllerError> {
        Ok(())
    }

    fn save(&mut self) -> Result<(), ControllerError> {
        Ok(())
    }

    fn update(&mut self, _delta: Duration) -> Result<(), ControllerError> {
        Ok(())
    }

    fn late_update(&mut self) -> Result<(), ControllerError> {
        Ok(())
    }

    fn rare_update(&mut self) -> Result<(), ControllerError> {
        Ok(())
    }

    fn reset(&mut self) -> Result<(), ControllerError> {
        Ok(())
    }
}

trait ErasedController: StateController {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: StateController> ErasedController for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-type singleton slots, in registration order.
#[derive(Resource, Default)]
pub struct ControllerRegistry {
    controllers: Vec<Box<dyn ErasedController>>,
    slots: HashMap<TypeId, usize>,
    initialized: bool,
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field(
                "controllers",
                &self.controllers.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: StateController>(&mut self, controller: T) -> Result<(), RegistryError> {
        let id = TypeId::of::<T>();
        if self.slots.contains_key(&id) {
            return Err(RegistryError::DuplicateInstance(type_name::<T>()));
        }
        self.slots.insert(id, self.controllers.len());
        self.controllers.push(Box::new(controller));
        Ok(())
    }

    pub fn get<T: StateController>(&self) -> Option<&T> {
        let index = *self.slots.get(&TypeId::of::<T>())?;
        self.controllers[index].as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: StateController>(&mut self) -> Option<&mut T> {
        let index = *self.slots.get(&TypeId::of::<T>())?;
        self.controllers[index].as_any_mut().downcast_mut::<T>()
    }

    pub fn contains<T: StateController>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Runs init, post_init, load and post_load over every controller.
    /// Returns the number of failed hook calls.
    pub fn initialize(&mut self) -> usize {
        let failures = self.run(LifecyclePhase::Init, |c| c.init())
            + self.run(LifecyclePhase::PostInit, |c| c.post_init())
            + self.run(LifecyclePhase::Load, |c| c.load())
            + self.run(LifecyclePhase::PostLoad, |c| c.post_load());
        self.initialized = true;
        failures
    }

    pub fn save(&mut self) -> usize {
        self.run(LifecyclePhase::Save, |c| c.save())
    }

    pub fn update(&mut self, delta: Duration) -> usize {
        self.run(LifecyclePhase::Update, |c| c.update(delta))
    }

    pub fn late_update(&mut self) -> usize {
        self.run(LifecyclePhase::LateUpdate, |c| c.late_update())
    }

    pub fn rare_update(&mut self) -> usize {
        self.run(LifecyclePhase::RareUpdate, |c| c.rare_update())
    }

    /// Resets every controller, then releases all slots so each type can be
    /// registered again.
    pub fn reset_all(&mut self) -> usize {
        let failures = self.run(LifecyclePhase::Reset, |c| c.reset());
        self.controllers.clear();
        self.slots.clear();
        self.initialized = false;
        failures
    }

    fn run(
        &mut self,
        phase: LifecyclePhase,
        mut hook: impl FnMut(&mut dyn ErasedController) -> Result<(), ControllerError>,
    ) -> usize {
        let mut failures = 0;
        for controller in &mut self.controllers {
            if let Err(error) = hook(controller.as_mut()) {
                error!("{} failed during {phase}: {error}", controller.name());
                failures += 1;
            }
        }
        failures
    }
}

#[derive(Resource)]
pub struct RareUpdateTimer(pub Timer);

impl RareUpdateTimer {
    pub fn new(interval: Duration) -> Self {
        Self(Timer::new(interval, TimerMode::Repeating))
    }
}

pub struct ControllersPlugin;
impl Plugin for ControllersPlugin {
    fn build(&self, app: &mut App) {
        let interval = app
            .world()
            .get_resource::<WindowConfig>()
            .map(WindowConfig::rare_update_interval)
            .unwrap_or(Duration::from_secs(1));

        app.init_resource::<ControllerRegistry>()
            .insert_resource(RareUpdateTimer::new(interval))
            .add_systems(PostStartup, initialize_controllers)
            .add_systems(Update, (update_controllers, rare_update_controllers).chain())
            .add_systems(PostUpdate, late_update_controllers)
            .add_systems(Last, shutdown_controllers);
    }
}

fn initialize_controllers(mut registry: ResMut<ControllerRegistry>) {
    if registry.is_initialized() {
        return;
    }
    let failures = registry.initialize();
    if failures > 0 {
        warn!("{failures} controller hook(s) failed during initialization");
    }
}

fn update_controllers(time: Res<Time>, mut registry: ResMut<ControllerRegistry>) {
    registry.update(time.delta());
}

fn rare_update_controllers(
    time: Res<Time>,
    mut timer: ResMut<RareUpdateTimer>,
    mut registry: ResMut<ControllerRegistry>,
) {
    timer.0.tick(time.delta());
    for _ in 0..timer.0.times_finished_this_tick() {
        registry.rare_update();
    }
}

fn late_update_controllers(mut registry: ResMut<ControllerRegistry>) {
    registry.late_update();
}

fn shutdown_controllers(
    mut exits: MessageReader<AppExit>,
    mut registry: ResMut<ControllerRegistry>,
) {
    if exits.read().next().is_none() {
        return;
    }
    registry.save();
    registry.reset_all();
}
