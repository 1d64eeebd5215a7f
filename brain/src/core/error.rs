// tank_brain_core/brain/src/core/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stale reference: {0}")]
    StaleReference(String),

    #[error("Numeric instability: {0}")]
    NumericInstability(String),

    #[error("Combatant {0} is disposed")]
    Disposed(u64),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BrainError {
    /// Faults the host may log and move past without touching other combatants.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BrainError::StaleReference(_)
                | BrainError::NumericInstability(_)
                | BrainError::NotFound(_)
        )
    }
}

pub type BrainResult<T> = Result<T, BrainError>;
