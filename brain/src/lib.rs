// tank_brain_core/brain/src/lib.rs

pub mod core;
pub mod concurrent;
pub mod entities;
pub mod world;
pub mod server;
pub mod operational;
pub mod systems;

pub use crate::core::config::{BrainConfig, SettingsPatch};
pub use crate::core::error::{BrainError, BrainResult};
pub use crate::entities::combatant::Combatant;
pub use crate::server::arena::Arena;
