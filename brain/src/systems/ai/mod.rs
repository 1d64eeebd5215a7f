// tank_brain_core/brain/src/systems/ai/mod.rs
pub mod adaptation;
pub mod avoidance;
pub mod behaviors;
pub mod brain;
pub mod decision;
pub mod group;
pub mod patrol;
pub mod targeting;
