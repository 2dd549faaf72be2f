//! Sea Program - authoritative game rules
//!
//! A naval trading and combat game hosted as a builtin on the runtime
//! engine. Players own a ship and a position on a one dimensional world
//! line, pay gold tolls to move and fight, and collect rewards from
//! seeded treasure targets. All rules execute inside the engine's
//! staged, single-writer action path; clients only ever submit signed
//! instructions and read committed records.

pub mod engine;
pub mod error;
pub mod instruction;
pub mod params;
pub mod processor;
pub mod rng;
pub mod state;

#[cfg(test)]
mod tests;

pub use engine::GameEngine;
pub use error::GameError;
pub use instruction::GameInstruction;
pub use params::{AccuracyParams, CostCurve, GameParams, ParamsError};
pub use processor::SeaProgram;
pub use rng::XorShift64;
pub use state::{
    ActionKind, AuthorityRecord, LedgerEntry, LedgerRecord, Outcome, PlayerRecord,
    RewardVaultRecord, ShipRecord, Target, VaultRecord, WorldRecord,
};

use sea_runtime::Address;

/// Address the program is registered under
pub fn id() -> Address {
    Address::from_label(b"sea_program_v1")
}

/// Derivation seeds and record kind tags
pub mod constants {
    /// Authority record seed
    pub const AUTHORITY_SEED: &[u8] = b"token_account_owner_pda";
    /// Toll vault seed prefix, combined with the token kind seed
    pub const TOKEN_VAULT_SEED: &[u8] = b"token_vault";
    /// Ship record seed prefix, combined with the owner address
    pub const SHIP_SEED: &[u8] = b"ship";
    /// World record seed
    pub const WORLD_SEED: &[u8] = b"level";
    /// Reward vault seed
    pub const REWARD_VAULT_SEED: &[u8] = b"chestVault";
    /// Action ledger seed
    pub const LEDGER_SEED: &[u8] = b"gameActions_history";
    /// Player record seed prefix, combined with the owner address
    pub const PLAYER_SEED: &[u8] = b"player";

    /// Record kind tags, unique per record shape
    pub const KIND_AUTHORITY: u8 = 1;
    pub const KIND_VAULT: u8 = 2;
    pub const KIND_REWARD_VAULT: u8 = 3;
    pub const KIND_WORLD: u8 = 4;
    pub const KIND_LEDGER: u8 = 5;
    pub const KIND_SHIP: u8 = 6;
    pub const KIND_PLAYER: u8 = 7;
}
