use std::{
    borrow::Cow,
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::*;
use once_cell::sync::Lazy;
use thiserror::Error;

use super::windows::{WindowKind, WindowTemplate};

const BUNDLED_TEMPLATES_JSON: &str = include_str!("./content/window_templates.json");

static BUNDLED_TEMPLATES: Lazy<Result<HashMap<String, WindowTemplate>, String>> =
    Lazy::new(|| {
        serde_json::from_str(BUNDLED_TEMPLATES_JSON)
            .map_err(|error| format!("failed to parse bundled window templates: {error}"))
    });

#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error("no template at `{0}`")]
    Missing(String),
    #[error("failed to read template `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse template `{path}`: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("`{0}` is not registered in the resource cache")]
    NotRegistered(WindowKind),
    #[error("`{0}` is already registered in the resource cache")]
    DuplicateRegistration(WindowKind),
}

/// Maps a registered path to a template. Loads are synchronous; the cache
/// decides when they happen.
pub trait TemplateSource: Send + Sync {
    fn load(&self, path: &str) -> Result<WindowTemplate, TemplateLoadError>;
}

/// Templates compiled into the binary, or any JSON object of
/// `path -> template`.
#[derive(Clone, Debug, Default)]
pub struct CatalogTemplateSource {
    templates: HashMap<String, WindowTemplate>,
}

impl CatalogTemplateSource {
    pub fn bundled() -> Result<Self, TemplateLoadError> {
        let templates = BUNDLED_TEMPLATES
            .as_ref()
            .map_err(|message| TemplateLoadError::Parse {
                path: String::from("<bundled>"),
                message: message.clone(),
            })?;
        Ok(Self {
            templates: templates.clone(),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, TemplateLoadError> {
        let templates = serde_json::from_str(json).map_err(|error| TemplateLoadError::Parse {
            path: String::from("<catalog>"),
            message: error.to_string(),
        })?;
        Ok(Self { templates })
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

impl TemplateSource for CatalogTemplateSource {
    fn load(&self, path: &str) -> Result<WindowTemplate, TemplateLoadError> {
        self.templates
            .get(path)
            .cloned()
            .ok_or_else(|| TemplateLoadError::Missing(path.to_string()))
    }
}

/// Reads `<root>/<path>.json` on every load.
#[derive(Clone, Debug)]
pub struct DirectoryTemplateSource {
    root: PathBuf,
}

impl DirectoryTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, path: &str) -> PathBuf {
        self.root.join(format!("{path}.json"))
    }
}

impl TemplateSource for DirectoryTemplateSource {
    fn load(&self, path: &str) -> Result<WindowTemplate, TemplateLoadError> {
        let file = self.file_for(path);
        let json = fs::read_to_string(&file).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TemplateLoadError::Missing(path.to_string())
            } else {
                TemplateLoadError::Io { path: file, source }
            }
        })?;
        serde_json::from_str(&json).map_err(|error| TemplateLoadError::Parse {
            path: path.to_string(),
            message: error.to_string(),
        })
    }
}

/// Templates built in code by the host.
#[derive(Clone, Debug, Default)]
pub struct MemoryTemplateSource {
    templates: HashMap<String, WindowTemplate>,
}

impl MemoryTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, template: WindowTemplate) -> Self {
        self.insert(path, template);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, template: WindowTemplate) {
        self.templates.insert(path.into(), template);
    }
}

impl TemplateSource for MemoryTemplateSource {
    fn load(&self, path: &str) -> Result<WindowTemplate, TemplateLoadError> {
        self.templates
            .get(path)
            .cloned()
            .ok_or_else(|| TemplateLoadError::Missing(path.to_string()))
    }
}

struct CacheEntry {
    kind: WindowKind,
    path: Cow<'static, str>,
    preload: bool,
    template: Option<Arc<WindowTemplate>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreloadCursor {
    next: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreloadProgress {
    Pending { visited: usize, total: usize },
    Complete,
}

/// Registered templates by kind. Loaded templates are kept for the life of
/// the cache; failed loads are retried on the next request.
pub struct ResourceCache {
    source: Box<dyn TemplateSource>,
    entries: Vec<CacheEntry>,
    index: HashMap<WindowKind, usize>,
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.entries.len())
            .field("loaded", &self.loaded_count())
            .finish_non_exhaustive()
    }
}

impl ResourceCache {
    pub fn new(source: impl TemplateSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        kind: WindowKind,
        path: impl Into<Cow<'static, str>>,
        preload: bool,
    ) -> Result<(), CacheError> {
        if self.index.contains_key(&kind) {
            return Err(CacheError::DuplicateRegistration(kind));
        }

        let mut entry = CacheEntry {
            kind: kind.clone(),
            path: path.into(),
            preload,
            template: None,
        };
        if preload {
            entry.template = load_entry(self.source.as_ref(), &entry);
        }
        self.index.insert(kind, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn resolve(&mut self, kind: &WindowKind) -> Result<Option<Arc<WindowTemplate>>, CacheError> {
        let index = *self
            .index
            .get(kind)
            .ok_or_else(|| CacheError::NotRegistered(kind.clone()))?;
        let entry = &mut self.entries[index];
        if entry.template.is_none() {
            entry.template = load_entry(self.source.as_ref(), entry);
        }
        Ok(entry.template.clone())
    }

    pub fn is_registered(&self, kind: &WindowKind) -> bool {
        self.index.contains_key(kind)
    }

    pub fn is_loaded(&self, kind: &WindowKind) -> bool {
        self.index
            .get(kind)
            .is_some_and(|index| self.entries[*index].template.is_some())
    }

    pub fn is_preload(&self, kind: &WindowKind) -> bool {
        self.index
            .get(kind)
            .is_some_and(|index| self.entries[*index].preload)
    }

    pub fn path_of(&self, kind: &WindowKind) -> Option<&str> {
        self.index
            .get(kind)
            .map(|index| self.entries[*index].path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn loaded_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.template.is_some())
            .count()
    }

    /// Loads at most one entry and moves the cursor past it. A failing
    /// entry is logged and skipped.
    pub fn preload_step(&mut self, cursor: &mut PreloadCursor) -> PreloadProgress {
        let total = self.entries.len();
        let Some(entry) = self.entries.get_mut(cursor.next) else {
            return PreloadProgress::Complete;
        };
        if entry.template.is_none() {
            entry.template = load_entry(self.source.as_ref(), entry);
        }
        cursor.next += 1;
        PreloadProgress::Pending {
            visited: cursor.next,
            total,
        }
    }

    /// Runs every preload step; returns how many entries are loaded after.
    pub fn preload_all(&mut self) -> usize {
        let mut cursor = PreloadCursor::default();
        while self.preload_step(&mut cursor) != PreloadProgress::Complete {}
        self.loaded_count()
    }
}

fn load_entry(source: &dyn TemplateSource, entry: &CacheEntry) -> Option<Arc<WindowTemplate>> {
    match source.load(&entry.path) {
        Ok(template) => {
            debug!("loaded window template `{}` from `{}`", entry.kind, entry.path);
            Some(Arc::new(template))
        }
        Err(error) => {
            error!("failed to load window template `{}`: {error}", entry.kind);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::systems::windows::WindowSettings;

    /// Fails the first `failures` loads, then serves a default window.
    struct FlakySource {
        failures: usize,
        calls: Arc<AtomicUsize>,
    }

    impl TemplateSource for FlakySource {
        fn load(&self, path: &str) -> Result<WindowTemplate, TemplateLoadError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures || path.starts_with("broken") {
                return Err(TemplateLoadError::Missing(path.to_string()));
            }
            Ok(WindowTemplate::window(WindowSettings::default()))
        }
    }

    fn flaky(failures: usize) -> (FlakySource, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            FlakySource {
                failures,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    #[test]
    fn bundled_catalog_parses_and_has_the_background() {
        let source = CatalogTemplateSource::bundled().expect("bundled catalog should parse");
        let background = source
            .load("windows/background")
            .expect("background template");
        assert!(background.background.is_some());

        for path in source.paths().filter(|path| *path != "windows/background") {
            let template = source.load(path).expect("window template");
            assert!(template.controller.is_some(), "{path} lacks a controller");
            assert!(template.payload.is_some(), "{path} lacks a payload");
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut cache = ResourceCache::new(MemoryTemplateSource::new());
        cache
            .register(WindowKind::from("pause"), "windows/pause", false)
            .expect("first registration");

        assert_eq!(
            cache.register(WindowKind::from("pause"), "windows/other", false),
            Err(CacheError::DuplicateRegistration(WindowKind::from("pause")))
        );
        assert_eq!(cache.path_of(&WindowKind::from("pause")), Some("windows/pause"));
    }

    #[test]
    fn unknown_kind_is_not_registered() {
        let mut cache = ResourceCache::new(MemoryTemplateSource::new());
        assert_eq!(
            cache.resolve(&WindowKind::from("ghost")),
            Err(CacheError::NotRegistered(WindowKind::from("ghost")))
        );
    }

    #[test]
    fn lazy_load_happens_once() {
        let (source, calls) = flaky(0);
        let mut cache = ResourceCache::new(source);
        cache
            .register(WindowKind::from("map"), "windows/map", false)
            .expect("register");
        assert!(!cache.is_loaded(&WindowKind::from("map")));

        let first = cache.resolve(&WindowKind::from("map")).expect("registered");
        let second = cache.resolve(&WindowKind::from("map")).expect("registered");

        assert!(first.is_some());
        assert!(Arc::ptr_eq(
            first.as_ref().expect("loaded"),
            second.as_ref().expect("loaded")
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_lazy_load_yields_none_then_retries() {
        let (source, calls) = flaky(1);
        let mut cache = ResourceCache::new(source);
        cache
            .register(WindowKind::from("map"), "windows/map", false)
            .expect("register");

        let first = cache.resolve(&WindowKind::from("map")).expect("registered");
        assert!(first.is_none());
        assert!(!cache.is_loaded(&WindowKind::from("map")));

        let second = cache.resolve(&WindowKind::from("map")).expect("registered");
        assert!(second.is_some());
        assert!(cache.is_loaded(&WindowKind::from("map")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_preload_is_retried_on_resolve() {
        let (source, calls) = flaky(1);
        let mut cache = ResourceCache::new(source);
        cache
            .register(WindowKind::from("win"), "windows/win", true)
            .expect("register");
        assert!(!cache.is_loaded(&WindowKind::from("win")));

        let retried = cache.resolve(&WindowKind::from("win")).expect("registered");
        assert!(retried.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn preload_visits_every_entry_and_survives_failures() {
        let (source, _) = flaky(0);
        let mut cache = ResourceCache::new(source);
        for (kind, path) in [("a", "windows/a"), ("b", "broken/b"), ("c", "windows/c")] {
            cache
                .register(WindowKind::from(kind), path, false)
                .expect("register");
        }

        let mut cursor = PreloadCursor::default();
        assert_eq!(
            cache.preload_step(&mut cursor),
            PreloadProgress::Pending { visited: 1, total: 3 }
        );
        assert!(cache.is_loaded(&WindowKind::from("a")));
        assert!(!cache.is_loaded(&WindowKind::from("c")));

        cache.preload_step(&mut cursor);
        cache.preload_step(&mut cursor);
        assert_eq!(cache.preload_step(&mut cursor), PreloadProgress::Complete);
        assert!(cache.is_loaded(&WindowKind::from("c")));
        assert!(!cache.is_loaded(&WindowKind::from("b")));
        assert_eq!(cache.preload_all(), 2);
    }

    #[test]
    fn directory_source_reads_json_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("windows")).expect("mkdir");
        fs::write(
            dir.path().join("windows/about.json"),
            r#"{ "controller": { "with_background": false }, "payload": { "title": "About" } }"#,
        )
        .expect("write template");
        fs::write(dir.path().join("windows/bad.json"), "{ not json").expect("write template");

        let source = DirectoryTemplateSource::new(dir.path());
        let about = source.load("windows/about").expect("about template");
        assert_eq!(
            about.payload.as_ref().and_then(|payload| payload.get_str("title")),
            Some("About")
        );
        assert!(matches!(
            source.load("windows/missing"),
            Err(TemplateLoadError::Missing(_))
        ));
        assert!(matches!(
            source.load("windows/bad"),
            Err(TemplateLoadError::Parse { .. })
        ));
    }
}
