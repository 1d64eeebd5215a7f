// tank_brain_core/brain/src/systems/mod.rs
pub mod ai;
pub mod physics;
pub mod scheduler;
pub mod sensors;
