//! Token ledger
//!
//! Balance bookkeeping for the game currencies. The ledger is the
//! external collaborator that actually moves value; the rules for WHO may
//! move value live in the staging context, which is the only path with
//! access to the ledger's transfer primitive. External holders can mint
//! (out-of-band funding), open holdings, and read balances.

use crate::{error::EngineError, keys::Address};
use borsh::{BorshDeserialize, BorshSerialize};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supported token kinds
#[derive(
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub enum TokenKind {
    /// Currency for tolls, upgrade costs, and rewards
    Gold,
    /// Ammunition resource, snapshotted into the player record at spawn
    Cannon,
    /// Consumable for area attacks
    Rum,
}

impl TokenKind {
    /// All supported kinds, in vault bootstrap order
    pub const ALL: [TokenKind; 3] = [TokenKind::Gold, TokenKind::Cannon, TokenKind::Rum];

    /// Derivation seed suffix for this kind's vault
    pub fn seed(&self) -> &'static [u8] {
        match self {
            TokenKind::Gold => b"gold",
            TokenKind::Cannon => b"cannon",
            TokenKind::Rum => b"rum",
        }
    }

    /// Stable single-byte tag (persistence keys)
    pub fn tag(&self) -> u8 {
        match self {
            TokenKind::Gold => 0,
            TokenKind::Cannon => 1,
            TokenKind::Rum => 2,
        }
    }

    /// Inverse of `tag`
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(TokenKind::Gold),
            1 => Some(TokenKind::Cannon),
            2 => Some(TokenKind::Rum),
            _ => None,
        }
    }
}

/// A holding is one `(kind, holder)` balance slot
pub type HoldingKey = (TokenKind, Address);

/// In-memory token balance ledger
///
/// A key being present means the holding is open, even at balance zero.
pub struct TokenLedger {
    balances: RwLock<HashMap<HoldingKey, u64>>,
}

impl TokenLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
        }
    }

    /// Balance of a holding; absent holdings read as zero
    pub fn balance(&self, kind: TokenKind, holder: &Address) -> u64 {
        self.balances
            .read()
            .get(&(kind, *holder))
            .copied()
            .unwrap_or(0)
    }

    /// Whether a holding has been opened
    pub fn holding_exists(&self, kind: TokenKind, holder: &Address) -> bool {
        self.balances.read().contains_key(&(kind, *holder))
    }

    /// Open a holding at balance zero; no-op if already open
    pub fn open_holding(&self, kind: TokenKind, holder: Address) {
        self.balances.write().entry((kind, holder)).or_insert(0);
    }

    /// Mint tokens into a holding, opening it if absent.
    ///
    /// This is the out-of-band funding path (admin and test tooling); it
    /// is not reachable from inside a unit of work.
    pub fn mint(&self, kind: TokenKind, holder: Address, amount: u64) -> Result<(), EngineError> {
        let mut balances = self.balances.write();
        let slot = balances.entry((kind, holder)).or_insert(0);
        *slot = slot
            .checked_add(amount)
            .ok_or(EngineError::Overflow { holder })?;
        Ok(())
    }

    /// Apply committed balances from one unit of work.
    ///
    /// Values are absolute post-transfer balances; the staging context has
    /// already validated every debit and credit against them.
    pub(crate) fn apply_committed(&self, staged: impl IntoIterator<Item = (HoldingKey, u64)>) {
        let mut balances = self.balances.write();
        for (key, value) in staged {
            balances.insert(key, value);
        }
    }

    /// Snapshot of every holding (for persistence)
    pub fn snapshot(&self) -> Vec<(HoldingKey, u64)> {
        self.balances
            .read()
            .iter()
            .map(|(k, v)| (*k, *v))
            .collect()
    }

    /// Restore holdings from a persisted snapshot
    pub fn restore(&self, entries: impl IntoIterator<Item = (HoldingKey, u64)>) {
        let mut balances = self.balances.write();
        for (key, value) in entries {
            balances.insert(key, value);
        }
    }

    /// Number of open holdings
    pub fn holding_count(&self) -> usize {
        self.balances.read().len()
    }

    /// Clear all holdings (for testing)
    pub fn clear(&self) {
        self.balances.write().clear();
    }
}

impl Default for TokenLedger {
    fn default() -> Self {
        Self::new()
    }
}
