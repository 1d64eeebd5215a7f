// tank_brain_core/brain/src/core/mod.rs
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod math;
pub mod types;
