//! Sea Runtime - deterministic game state engine
//!
//! This crate provides the core runtime for the game engine:
//! - Single-writer execution of signed action requests
//! - Write-ahead staging so every unit of work commits whole or not at all
//! - Custodial token ledger with program-mediated transfers
//! - In-memory record storage with optional disk persistence
//! - 20Hz tick production loop

pub mod authority;
pub mod context;
pub mod engine;
pub mod error;
pub mod keys;
pub mod persistence;
pub mod producer;
pub mod record;
pub mod store;
pub mod tokens;

pub use authority::EconomyAuthority;
pub use context::{ActionContext, Clock};
pub use engine::{ActionRequest, BuiltinProgram, Engine};
pub use error::EngineError;
pub use keys::{derive_address, Address, AddressParseError};
pub use persistence::{EngineMetadata, PersistentStore, RecordStorePersistence};
pub use producer::{ActionStatus, SubmitHandle, TickConfig, TickProducer, TickUpdate};
pub use record::{RecordData, StoredRecord};
pub use store::RecordStore;
pub use tokens::{HoldingKey, TokenKind, TokenLedger};

/// Tick time in milliseconds (20Hz)
pub const TICK_TIME_MS: u64 = 50;

/// Ticks per second
pub const TICKS_PER_SECOND: u64 = 20;

/// Maximum action requests per tick
pub const MAX_ACTIONS_PER_TICK: usize = 64;
