// tank_brain_core/brain/src/concurrent/mod.rs
pub mod event_queue;
