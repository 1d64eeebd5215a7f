// tank_brain_core/brain/src/server/mod.rs
pub mod arena;
pub mod game_loop;
