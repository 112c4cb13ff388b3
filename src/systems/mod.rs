pub mod animation;
pub mod audio;
pub mod controllers;
pub mod events;
pub mod resources;
pub mod windows;
