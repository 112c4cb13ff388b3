use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
    time::Duration,
};

use bevy::prelude::*;

use crate::{
    data::{WindowConfig, WindowTimings},
    systems::{events::EventBus, resources::ResourceCache},
};

use super::{
    background::WindowBackground,
    canvas::{CanvasHost, CanvasNode},
    controller::{ControllerNotice, NoticeKind, WindowController},
    defs::{WindowError, WindowHandle, WindowKind, WindowPayload, WindowState},
    events::{
        WindowAppearing, WindowHidden, WindowHiding, WindowNotification, WindowOutput,
        WindowShown, WindowSoundRequest, WindowStateChanged, WindowTopChanged,
    },
    stack::WindowStack,
};

/// Owns every live window, the stack they are shown in, the shared
/// background and the canvas they are laid out on.
///
/// Controllers report what happened through notices; the manager answers
/// them from a FIFO so a reaction never re-enters a transition already in
/// progress. Every public operation leaves the queue empty.
#[derive(Resource)]
pub struct WindowManager {
    config: WindowConfig,
    cache: ResourceCache,
    windows: BTreeMap<WindowHandle, WindowController>,
    stack: WindowStack,
    canvas: CanvasHost,
    background: Option<WindowBackground>,
    bus: EventBus,
    output: Vec<WindowOutput>,
    pending: VecDeque<ControllerNotice>,
    next_handle: u64,
    initialized: bool,
}

impl fmt::Debug for WindowManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowManager")
            .field("stack", &self.stack)
            .field("windows", &self.windows.len())
            .field("background", &self.background)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl WindowManager {
    pub fn new(config: WindowConfig, cache: ResourceCache) -> Self {
        let canvas = CanvasHost::new(config.canvas.clone());
        Self {
            config,
            cache,
            windows: BTreeMap::new(),
            stack: WindowStack::new(),
            canvas,
            background: None,
            bus: EventBus::new(),
            output: Vec::new(),
            pending: VecDeque::new(),
            next_handle: 0,
            initialized: false,
        }
    }

    /// Sets up the shared background and assigns the canvas layer. Safe to
    /// call more than once.
    pub fn initialize(&mut self) -> Result<(), WindowError> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        self.canvas.try_set_canvas_layer();

        let settings = if self.cache.is_registered(&WindowKind::BACKGROUND) {
            let template = self
                .cache
                .resolve(&WindowKind::BACKGROUND)?
                .ok_or(WindowError::TemplateUnavailable(WindowKind::BACKGROUND))?;
            template.background.ok_or(WindowError::MissingComponent {
                kind: WindowKind::BACKGROUND,
                component: "background",
            })?
        } else {
            info!("no background template registered; using configured background settings");
            self.config.background
        };

        self.background = Some(WindowBackground::new(settings));
        self.canvas.instantiate(CanvasNode::Background);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Opens a window of `kind` and shows it. Failures are logged; an
    /// already open kind is a quiet no-op.
    pub fn open(&mut self, kind: impl Into<WindowKind>) -> Option<WindowHandle> {
        self.open_logged(kind.into(), None::<fn(&mut WindowPayload)>)
    }

    /// Opens a window of `kind` and hands its payload to `init` instead of
    /// showing it; the caller shows it with [`Self::request_show`].
    pub fn open_with(
        &mut self,
        kind: impl Into<WindowKind>,
        init: impl FnOnce(&mut WindowPayload),
    ) -> Option<WindowHandle> {
        self.open_logged(kind.into(), Some(init))
    }

    pub fn try_open<F>(&mut self, kind: WindowKind, init: Option<F>) -> Result<WindowHandle, WindowError>
    where
        F: FnOnce(&mut WindowPayload),
    {
        if self.has_live_window(&kind) {
            return Err(WindowError::AlreadyOpen(kind));
        }
        if !self.initialized {
            if let Err(error) = self.initialize() {
                error!("window background unavailable: {error}");
            }
        }

        let template = self
            .cache
            .resolve(&kind)?
            .ok_or_else(|| WindowError::TemplateUnavailable(kind.clone()))?;
        let settings = template
            .controller
            .clone()
            .ok_or_else(|| WindowError::MissingComponent {
                kind: kind.clone(),
                component: "controller",
            })?;
        let mut payload = template
            .payload
            .clone()
            .ok_or_else(|| WindowError::MissingComponent {
                kind: kind.clone(),
                component: "payload",
            })?;

        self.next_handle += 1;
        let handle = WindowHandle::from_raw(self.next_handle);
        let auto_show = init.is_none();
        if let Some(init) = init {
            init(&mut payload);
        }

        let mut window = WindowController::new(handle, kind.clone(), settings, payload);
        self.canvas.instantiate(CanvasNode::Window(handle));
        self.canvas.attach(&mut window);
        self.windows.insert(handle, window);
        self.output.push(WindowOutput::Spawned {
            window: handle,
            kind,
        });

        if auto_show {
            self.request_show(handle, false)?;
        }
        Ok(handle)
    }

    pub fn request_show(&mut self, window: WindowHandle, force: bool) -> Result<(), WindowError> {
        self.run(window, |controller, timings, out| {
            controller.show(force, timings, out)
        })
    }

    pub fn request_hide(&mut self, window: WindowHandle, force: bool) -> Result<(), WindowError> {
        self.run(window, |controller, timings, out| {
            controller.hide(force, timings, out)
        })
    }

    pub fn suspend(&mut self, window: WindowHandle) -> Result<(), WindowError> {
        self.run(window, |controller, timings, out| controller.suspend(timings, out))
    }

    pub fn wake_up(&mut self, window: WindowHandle) -> Result<(), WindowError> {
        self.run(window, |controller, timings, out| controller.wake_up(timings, out))
    }

    pub fn kill(&mut self, window: WindowHandle) -> Result<(), WindowError> {
        self.run(window, |controller, _, out| controller.kill(out))
    }

    pub fn kill_silently(&mut self, window: WindowHandle) -> Result<(), WindowError> {
        self.run(window, |controller, _, out| controller.kill_silently(out))
    }

    /// Registers the callback run once when `window` is torn down.
    pub fn set_on_hidden(
        &mut self,
        window: WindowHandle,
        callback: impl FnOnce(WindowHandle) + Send + Sync + 'static,
    ) -> Result<(), WindowError> {
        self.windows
            .get_mut(&window)
            .ok_or(WindowError::UnknownWindow(window))?
            .set_on_hidden(callback);
        Ok(())
    }

    /// Starts an animated hide of the top window if it may be dismissed by
    /// an outside click or back navigation.
    pub fn hide_top_if_dismissable(&mut self) -> bool {
        let Some(top) = self.stack.top() else {
            return false;
        };
        if !self.is_dismissable(top) {
            return false;
        }
        match self.request_hide(top, false) {
            Ok(()) => true,
            Err(error) => {
                warn!("could not dismiss top window: {error}");
                false
            }
        }
    }

    pub fn on_background_click(&mut self) -> bool {
        self.hide_top_if_dismissable()
    }

    pub fn on_back_navigation(&mut self) -> bool {
        self.hide_top_if_dismissable()
    }

    /// Hides windows from the top down until one may not be dismissed. The
    /// top animates out; the covered ones are torn down at once. Returns how
    /// many windows were asked to hide.
    pub fn hide_all_dismissable(&mut self, callback: impl FnOnce()) -> usize {
        let mut dismissable = Vec::new();
        for handle in self.stack.iter().rev() {
            if !self.is_dismissable(handle) {
                break;
            }
            if self.state_of(handle) != Some(WindowState::Hiding) {
                dismissable.push(handle);
            }
        }

        let mut hidden = 0;
        if let Some((top, covered)) = dismissable.split_first() {
            for window in covered {
                if self.request_hide(*window, true).is_ok() {
                    hidden += 1;
                }
            }
            let force = !self.stack.is_top(*top);
            if self.request_hide(*top, force).is_ok() {
                hidden += 1;
            }
        }
        callback();
        hidden
    }

    /// Advances every running sequence, then answers what they reported.
    pub fn tick(&mut self, delta: Duration) {
        let mut out = Vec::new();
        for window in self.windows.values_mut() {
            window.advance(delta, &mut out);
        }
        if let Some(background) = self.background.as_mut() {
            background.advance(delta);
        }
        self.pending.extend(out);
        self.drain();
    }

    /// Everything produced since the last call, oldest first.
    pub fn take_output(&mut self) -> Vec<WindowOutput> {
        std::mem::take(&mut self.output)
    }

    pub fn current_window(&self) -> Option<WindowHandle> {
        self.stack.top()
    }

    pub fn has_windows(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn has_any_active_windows(&self) -> bool {
        self.windows.values().any(WindowController::is_active_object)
    }

    pub fn has_live_window(&self, kind: &WindowKind) -> bool {
        self.live_window(kind).is_some()
    }

    pub fn live_window(&self, kind: &WindowKind) -> Option<WindowHandle> {
        self.windows
            .values()
            .find(|window| window.kind() == kind && !window.is_destroyed())
            .map(WindowController::handle)
    }

    pub fn state_of(&self, window: WindowHandle) -> Option<WindowState> {
        self.windows.get(&window).map(WindowController::state)
    }

    pub fn is_interactable(&self, window: WindowHandle) -> bool {
        self.windows
            .get(&window)
            .is_some_and(WindowController::is_interactable)
    }

    pub fn stack(&self) -> &WindowStack {
        &self.stack
    }

    pub fn controller(&self, window: WindowHandle) -> Option<&WindowController> {
        self.windows.get(&window)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &WindowController> {
        self.windows.values()
    }

    pub fn payload_mut(&mut self, window: WindowHandle) -> Option<&mut WindowPayload> {
        self.windows.get_mut(&window).map(WindowController::payload_mut)
    }

    pub fn background(&self) -> Option<&WindowBackground> {
        self.background.as_ref()
    }

    pub fn canvas(&self) -> &CanvasHost {
        &self.canvas
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResourceCache {
        &mut self.cache
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn open_logged<F>(&mut self, kind: WindowKind, init: Option<F>) -> Option<WindowHandle>
    where
        F: FnOnce(&mut WindowPayload),
    {
        match self.try_open(kind, init) {
            Ok(handle) => Some(handle),
            Err(WindowError::AlreadyOpen(kind)) => {
                debug!("`{kind}` is already open");
                None
            }
            Err(error) => {
                error!("failed to open window: {error}");
                None
            }
        }
    }

    fn is_dismissable(&self, window: WindowHandle) -> bool {
        self.windows
            .get(&window)
            .is_some_and(|controller| controller.settings().hide_by_misclick)
    }

    fn run(
        &mut self,
        window: WindowHandle,
        transition: impl FnOnce(&mut WindowController, &WindowTimings, &mut Vec<ControllerNotice>),
    ) -> Result<(), WindowError> {
        self.apply(window, transition)?;
        self.drain();
        Ok(())
    }

    /// Runs a transition and queues its notices without answering them.
    fn apply(
        &mut self,
        window: WindowHandle,
        transition: impl FnOnce(&mut WindowController, &WindowTimings, &mut Vec<ControllerNotice>),
    ) -> Result<(), WindowError> {
        let timings = self.config.timings;
        let controller = self
            .windows
            .get_mut(&window)
            .ok_or(WindowError::UnknownWindow(window))?;
        let mut out = Vec::new();
        transition(controller, &timings, &mut out);
        self.pending.extend(out);
        Ok(())
    }

    fn drain(&mut self) {
        while let Some(notice) = self.pending.pop_front() {
            self.dispatch(&notice);
            match notice.kind {
                NoticeKind::StateChanged {
                    state: WindowState::Appearing,
                    forced,
                } => self.on_appearing(notice.window, forced),
                NoticeKind::StateChanged {
                    state: WindowState::Hiding,
                    ..
                } => self.on_hiding(notice.window),
                NoticeKind::StateChanged {
                    state: WindowState::Hidden,
                    ..
                } => self.pop(notice.window),
                NoticeKind::Destroyed => self.release(notice.window),
                _ => {}
            }
        }
    }

    fn dispatch(&mut self, notice: &ControllerNotice) {
        if let NoticeKind::PlaySound(name) = &notice.kind {
            self.bus.publish(&WindowSoundRequest { name: name.clone() });
            self.output.push(WindowOutput::Sound(name.clone()));
            return;
        }

        let Some(kind) = self.windows.get(&notice.window).map(|w| w.kind().clone()) else {
            return;
        };
        let window = notice.window;
        let notification = match notice.kind {
            NoticeKind::StateChanged { state, forced } => {
                let event = WindowStateChanged {
                    window,
                    kind,
                    state,
                    forced,
                };
                self.bus.publish(&event);
                WindowNotification::StateChanged(event)
            }
            NoticeKind::Appearing => {
                let event = WindowAppearing { window, kind };
                self.bus.publish(&event);
                WindowNotification::Appearing(event)
            }
            NoticeKind::Shown => {
                let event = WindowShown { window, kind };
                self.bus.publish(&event);
                WindowNotification::Shown(event)
            }
            NoticeKind::Hiding => {
                let event = WindowHiding { window, kind };
                self.bus.publish(&event);
                WindowNotification::Hiding(event)
            }
            NoticeKind::Hidden => {
                let event = WindowHidden { window, kind };
                self.bus.publish(&event);
                WindowNotification::Hidden(event)
            }
            NoticeKind::PlaySound(_) | NoticeKind::Destroyed => return,
        };
        self.output.push(WindowOutput::Notification(notification));
    }

    fn on_appearing(&mut self, window: WindowHandle, forced: bool) {
        let previous = self.stack.top().filter(|top| *top != window);
        if let (Some(new_window), Some(old_window)) = (
            self.windows.get(&window),
            previous.and_then(|top| self.windows.get(&top)),
        ) {
            self.canvas.check_layers(new_window, old_window);
        }

        self.stack.push(window);
        if let Some(previous) = previous {
            if self
                .state_of(previous)
                .is_some_and(|state| matches!(state, WindowState::Appearing | WindowState::Active))
            {
                if let Err(error) = self.apply(previous, |controller, timings, out| {
                    controller.suspend(timings, out)
                }) {
                    warn!("could not suspend covered window: {error}");
                }
            }
        }

        self.setup_layers(window, forced);
        self.top_changed(window);
    }

    /// A window below the top leaves the stack as soon as it starts hiding.
    fn on_hiding(&mut self, window: WindowHandle) {
        if !self.stack.contains(window) || self.stack.is_top(window) {
            return;
        }
        self.stack.remove(window);
        if let Some(top) = self.stack.top() {
            self.setup_layers(top, false);
        }
        if self.canvas.sibling_index(CanvasNode::Window(window)).is_some() {
            self.canvas.move_to_first_plane(CanvasNode::Window(window));
        }
    }

    fn pop(&mut self, window: WindowHandle) {
        let was_top = self.stack.is_top(window);
        if !self.stack.remove(window) {
            return;
        }

        match self.stack.top() {
            Some(top) if was_top => {
                self.setup_layers(top, false);
                self.top_changed(top);
                if self.state_of(top) == Some(WindowState::Suspended) {
                    if let Err(error) = self.apply(top, |controller, timings, out| {
                        controller.wake_up(timings, out)
                    }) {
                        warn!("could not wake up new top window: {error}");
                    }
                }
            }
            Some(top) => self.setup_layers(top, false),
            None => {
                let wanted_background = self
                    .windows
                    .get(&window)
                    .is_some_and(|controller| controller.settings().with_background);
                if let Some(background) = self.background.as_mut() {
                    background.hide(!wanted_background);
                }
            }
        }
    }

    fn release(&mut self, window: WindowHandle) {
        self.pop(window);
        let Some(mut controller) = self.windows.remove(&window) else {
            return;
        };
        if let Some(callback) = controller.take_on_hidden() {
            callback(window);
        }
        self.canvas.remove(CanvasNode::Window(window));
        self.output.push(WindowOutput::Despawned(window));
        debug!("{window} `{}` released", controller.kind());
    }

    fn setup_layers(&mut self, window: WindowHandle, force: bool) {
        let has_windows_with_background = self.stack.iter().any(|handle| {
            self.windows
                .get(&handle)
                .is_some_and(|controller| controller.settings().with_background)
        });
        let Some(controller) = self.windows.get(&window) else {
            return;
        };
        self.canvas.setup_layers(
            controller,
            self.background.as_mut(),
            has_windows_with_background,
            force,
        );
    }

    fn top_changed(&mut self, window: WindowHandle) {
        let Some(kind) = self.windows.get(&window).map(|w| w.kind().clone()) else {
            return;
        };
        let event = WindowTopChanged { window, kind };
        self.bus.publish(&event);
        self.output
            .push(WindowOutput::Notification(WindowNotification::TopChanged(event)));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::systems::{
        animation::ShowAnimation,
        resources::MemoryTemplateSource,
        windows::defs::{WindowSettings, WindowTemplate},
    };

    fn manager_with(windows: &[(&'static str, WindowSettings)]) -> WindowManager {
        let mut source = MemoryTemplateSource::new();
        let mut cache_entries = Vec::new();
        for (kind, settings) in windows {
            source.insert(*kind, WindowTemplate::window(settings.clone()));
            cache_entries.push(*kind);
        }
        let mut cache = ResourceCache::new(source);
        for kind in cache_entries {
            cache
                .register(WindowKind::from(kind), kind, false)
                .expect("register");
        }
        let mut manager = WindowManager::new(WindowConfig::default(), cache);
        manager.initialize().expect("initialize");
        manager
    }

    #[test]
    fn initialize_falls_back_to_configured_background() {
        let manager = manager_with(&[]);
        assert!(manager.is_initialized());
        assert!(manager.background().is_some());
        assert_eq!(manager.canvas().siblings(), &[CanvasNode::Background]);
    }

    #[test]
    fn background_template_without_section_is_rejected() {
        let source = MemoryTemplateSource::new().with("bg", WindowTemplate::default());
        let mut cache = ResourceCache::new(source);
        cache
            .register(WindowKind::BACKGROUND, "bg", false)
            .expect("register");
        let mut manager = WindowManager::new(WindowConfig::default(), cache);

        assert_eq!(
            manager.initialize(),
            Err(WindowError::MissingComponent {
                kind: WindowKind::BACKGROUND,
                component: "background"
            })
        );
    }

    #[test]
    fn template_without_payload_fails_to_open() {
        let source = MemoryTemplateSource::new().with(
            "bare",
            WindowTemplate {
                controller: Some(WindowSettings::default()),
                ..default()
            },
        );
        let mut cache = ResourceCache::new(source);
        cache
            .register(WindowKind::from("bare"), "bare", false)
            .expect("register");
        let mut manager = WindowManager::new(WindowConfig::default(), cache);

        assert_eq!(
            manager.try_open(WindowKind::from("bare"), None::<fn(&mut WindowPayload)>),
            Err(WindowError::MissingComponent {
                kind: WindowKind::from("bare"),
                component: "payload"
            })
        );
        assert!(manager.controllers().next().is_none());
    }

    #[test]
    fn registered_template_that_fails_to_load_is_unavailable() {
        let mut cache = ResourceCache::new(MemoryTemplateSource::new());
        cache
            .register(WindowKind::from("map"), "windows/missing", false)
            .expect("register");
        let mut manager = WindowManager::new(WindowConfig::default(), cache);

        assert_eq!(
            manager.try_open(WindowKind::from("map"), None::<fn(&mut WindowPayload)>),
            Err(WindowError::TemplateUnavailable(WindowKind::from("map")))
        );
        assert!(manager.controllers().next().is_none());
        assert_eq!(manager.open("map"), None);
    }

    #[test]
    fn unregistered_kind_is_reported() {
        let mut manager = manager_with(&[]);
        assert!(matches!(
            manager.try_open(WindowKind::from("ghost"), None::<fn(&mut WindowPayload)>),
            Err(WindowError::Cache(_))
        ));
        assert_eq!(manager.open("ghost"), None);
    }

    #[test]
    fn open_with_initializer_waits_for_show() {
        let mut manager = manager_with(&[("pause", WindowSettings::default())]);

        let handle = manager
            .open_with("pause", |payload| payload.set("title", "Paused"))
            .expect("opened");

        assert_eq!(manager.state_of(handle), Some(WindowState::Hidden));
        assert!(!manager.has_windows());
        assert_eq!(
            manager
                .controller(handle)
                .and_then(|c| c.payload().get_str("title")),
            Some("Paused")
        );

        manager.request_show(handle, true).expect("live window");
        assert_eq!(manager.state_of(handle), Some(WindowState::Active));
        assert_eq!(manager.current_window(), Some(handle));
    }

    #[test]
    fn unknown_handles_are_errors() {
        let mut manager = manager_with(&[]);
        let ghost = WindowHandle::from_raw(42);
        manager.take_output();
        assert_eq!(
            manager.request_hide(ghost, false),
            Err(WindowError::UnknownWindow(ghost))
        );
        assert!(manager.set_on_hidden(ghost, |_| {}).is_err());
        assert!(manager.take_output().is_empty());
        assert!(!manager.has_windows());
    }

    #[test]
    fn hidden_callback_runs_once_on_kill() {
        let mut manager = manager_with(&[("map", WindowSettings::default())]);
        let handle = manager.open("map").expect("opened");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        manager
            .set_on_hidden(handle, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .expect("live window");

        manager.kill(handle).expect("live window");
        assert!(manager.kill(handle).is_err());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(manager.controller(handle).is_none());
        assert!(!manager.has_windows());
    }

    #[test]
    fn kill_silently_of_the_top_pops_and_wakes_the_next() {
        let mut manager = manager_with(&[
            ("a", WindowSettings::default()),
            ("b", WindowSettings::default()),
        ]);
        let a = manager.open("a").expect("a");
        let b = manager.open("b").expect("b");
        manager.take_output();

        manager.kill_silently(b).expect("live window");

        assert_eq!(manager.current_window(), Some(a));
        assert_eq!(manager.state_of(a), Some(WindowState::Active));
        let output = manager.take_output();
        assert!(!output.iter().any(|item| matches!(
            item,
            WindowOutput::Notification(WindowNotification::Hidden(_))
        )));
        assert!(output.contains(&WindowOutput::Despawned(b)));
    }

    #[test]
    fn sounds_and_spawns_are_reported_in_order() {
        let mut manager = manager_with(&[(
            "about",
            WindowSettings {
                show_animation: ShowAnimation::None,
                show_sound: Some(String::from("pop")),
                ..default()
            },
        )]);
        let handle = manager.open("about").expect("opened");

        let output = manager.take_output();
        assert_eq!(
            output[0],
            WindowOutput::Spawned {
                window: handle,
                kind: WindowKind::from("about")
            }
        );
        assert_eq!(output[1], WindowOutput::Sound(String::from("pop")));
        assert!(manager.take_output().is_empty());
    }

    #[test]
    fn bus_subscribers_see_top_changes() {
        let mut manager = manager_with(&[("settings", WindowSettings::default())]);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        manager.bus().subscribe::<WindowTopChanged>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        manager.open("settings").expect("opened");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
