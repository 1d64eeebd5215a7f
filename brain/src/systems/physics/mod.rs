// tank_brain_core/brain/src/systems/physics/mod.rs
pub mod ballistics;
pub mod collision;
pub mod locomotion;
