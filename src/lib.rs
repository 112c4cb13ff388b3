pub mod data;
pub mod startup;
pub mod systems;
