// tank_brain_core/brain/src/operational/monitoring/mod.rs
pub mod metrics;
