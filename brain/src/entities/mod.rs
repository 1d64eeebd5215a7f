// tank_brain_core/brain/src/entities/mod.rs
pub mod combatant;
pub mod wall;
