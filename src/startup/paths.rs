use phf::phf_map;

use bevy::prelude::*;

use crate::systems::{
    resources::{CacheError, CatalogTemplateSource, MemoryTemplateSource, ResourceCache},
    windows::WindowKind,
};

pub const SETTINGS: WindowKind = WindowKind::from_static("settings");
pub const MAP: WindowKind = WindowKind::from_static("map");
pub const PAUSE: WindowKind = WindowKind::from_static("pause");
pub const LOSE: WindowKind = WindowKind::from_static("lose");
pub const WIN: WindowKind = WindowKind::from_static("win");
pub const ABOUT: WindowKind = WindowKind::from_static("about");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPath {
    pub path: &'static str,
    pub preload: bool,
}

/// Kind -> template path of every bundled window.
pub static WINDOW_PATHS: phf::Map<&'static str, WindowPath> = phf_map! {
    "window_background" => WindowPath { path: "windows/background", preload: true },
    "settings" => WindowPath { path: "windows/settings", preload: false },
    "map" => WindowPath { path: "windows/map", preload: false },
    "pause" => WindowPath { path: "windows/pause", preload: true },
    "lose" => WindowPath { path: "windows/lose", preload: false },
    "win" => WindowPath { path: "windows/win", preload: false },
    "about" => WindowPath { path: "windows/about", preload: false },
};

pub fn register_all_windows(cache: &mut ResourceCache) -> Result<(), CacheError> {
    for (kind, entry) in WINDOW_PATHS.entries() {
        cache.register(WindowKind::from_static(*kind), entry.path, entry.preload)?;
    }
    Ok(())
}

/// A cache over the bundled catalog with every bundled window registered.
pub fn bundled_cache() -> ResourceCache {
    let mut cache = match CatalogTemplateSource::bundled() {
        Ok(source) => ResourceCache::new(source),
        Err(error) => {
            error!("bundled window templates unavailable: {error}");
            ResourceCache::new(MemoryTemplateSource::new())
        }
    };
    if let Err(error) = register_all_windows(&mut cache) {
        error!("failed to register bundled windows: {error}");
    }
    cache
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bundled_path_resolves() {
        let mut cache = bundled_cache();
        assert_eq!(cache.len(), WINDOW_PATHS.len());
        assert!(cache.is_loaded(&WindowKind::BACKGROUND));

        for kind in [SETTINGS, MAP, PAUSE, LOSE, WIN, ABOUT] {
            let template = cache.resolve(&kind).expect("registered");
            assert!(template.is_some(), "{kind} did not load");
        }
    }

    #[test]
    fn registering_twice_reports_the_duplicate() {
        let mut cache = bundled_cache();
        assert!(matches!(
            register_all_windows(&mut cache),
            Err(CacheError::DuplicateRegistration(_))
        ));
    }
}
