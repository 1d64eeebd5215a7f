// tank_brain_core/brain/src/operational/mod.rs
pub mod monitoring;
