// tank_brain_core/brain/src/world/mod.rs
pub mod map_generator;
pub mod obstacle_index;
pub mod pathfinding;
pub mod physics;
pub mod query;
pub mod registry;
pub mod sandbox;
