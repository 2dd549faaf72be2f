//! Game error taxonomy
//!
//! Every rejected action maps to exactly one variant, and each variant
//! names the offending record so callers can report precisely. Errors
//! cross the runtime boundary wrapped in `EngineError::Program` and are
//! recovered by downcast on the way back out.

use sea_runtime::{Address, EngineError, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Signer does not control the record the action touches
    #[error("Signer is not authorized for record {record}")]
    Unauthorized { record: Address },

    /// A required record has not been created yet
    #[error("Record {record} is not initialized")]
    AccountNotInitialized { record: Address },

    /// Creation attempted over an existing record
    #[error("Record {record} is already initialized")]
    AlreadyInitialized { record: Address },

    /// Holding cannot cover a toll, cost, or payout
    #[error("Holding {record} has {available} tokens, {needed} needed")]
    InsufficientFunds {
        record: Address,
        needed: u64,
        available: u64,
    },

    /// Player lacks the consumable resource the action spends
    #[error("Record {record} has no {resource:?} charges left")]
    InsufficientResource { record: Address, resource: TokenKind },

    /// Ship is already at the configured level cap
    #[error("Ship {record} is already at max level {level}")]
    MaxLevelReached { record: Address, level: u16 },

    /// Movement would leave the playable line
    #[error("Position {candidate} is outside [0, {bound}] for {record}")]
    OutOfBounds {
        record: Address,
        candidate: i64,
        bound: u32,
    },

    /// Target index does not exist in the world
    #[error("Target {index} does not exist in world {record}")]
    InvalidTarget { record: Address, index: u32 },

    /// Record exists but has the wrong kind or owning program
    #[error("Record {record} has an unexpected kind or owner")]
    InvalidAccount { record: Address },

    /// Arithmetic overflow while updating the record
    #[error("Arithmetic overflow updating {record}")]
    Overflow { record: Address },

    /// Arithmetic underflow while updating the record
    #[error("Arithmetic underflow updating {record}")]
    Underflow { record: Address },

    /// Failure with no game-level meaning (serialization, queue state)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for GameError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unauthorized { record } => GameError::Unauthorized { record },
            EngineError::NotInitialized { record } => GameError::AccountNotInitialized { record },
            EngineError::AlreadyInitialized { record } => GameError::AlreadyInitialized { record },
            EngineError::InvalidAccount { record } => GameError::InvalidAccount { record },
            EngineError::InsufficientFunds {
                holder,
                needed,
                available,
            } => GameError::InsufficientFunds {
                record: holder,
                needed,
                available,
            },
            EngineError::Overflow { holder } => GameError::Overflow { record: holder },
            EngineError::Underflow { holder } => GameError::Underflow { record: holder },
            // Recover the original game error from the runtime wrapper
            EngineError::Program(inner) => match inner.downcast::<GameError>() {
                Ok(game) => game,
                Err(other) => GameError::Internal(other.to_string()),
            },
            other => GameError::Internal(other.to_string()),
        }
    }
}

impl From<GameError> for EngineError {
    fn from(err: GameError) -> Self {
        EngineError::Program(anyhow::Error::new(err))
    }
}
