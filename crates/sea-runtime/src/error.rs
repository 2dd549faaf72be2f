//! Runtime errors
//!
//! Every failure inside a unit of work aborts the whole unit; the engine
//! never applies partial effects. Errors carry the offending record or
//! holder so callers can report exactly what was rejected.

use crate::keys::Address;
use thiserror::Error;

/// Errors produced by the hosting runtime
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unauthorized access to record {record}")]
    Unauthorized { record: Address },

    #[error("record {record} is not initialized")]
    NotInitialized { record: Address },

    #[error("record {record} is already initialized")]
    AlreadyInitialized { record: Address },

    #[error("record {record} does not match the expected kind or owner")]
    InvalidAccount { record: Address },

    #[error("insufficient funds for {holder}: need {needed}, have {available}")]
    InsufficientFunds {
        holder: Address,
        needed: u64,
        available: u64,
    },

    #[error("balance overflow for {holder}")]
    Overflow { holder: Address },

    #[error("balance underflow for {holder}")]
    Underflow { holder: Address },

    #[error("no builtin registered for program {program}")]
    UnknownProgram { program: Address },

    #[error("invalid instruction data")]
    InvalidInstructionData,

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("action queue is full")]
    QueueFull,

    #[error("engine is not accepting submissions")]
    Shutdown,

    /// Program-defined failure, carried opaquely across the builtin boundary
    #[error(transparent)]
    Program(#[from] anyhow::Error),
}
