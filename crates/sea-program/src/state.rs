//! Game record state
//!
//! Each record type is a borsh payload stored under a derived address.
//! The derivation helpers here are the single source of truth for where
//! a record lives; the processor and the read side both go through them.

use borsh::{BorshDeserialize, BorshSerialize};
use sea_runtime::{derive_address, Address, RecordData, TokenKind};

use crate::constants::{
    AUTHORITY_SEED, KIND_AUTHORITY, KIND_LEDGER, KIND_PLAYER, KIND_REWARD_VAULT, KIND_SHIP,
    KIND_VAULT, KIND_WORLD, LEDGER_SEED, PLAYER_SEED, REWARD_VAULT_SEED, SHIP_SEED,
    TOKEN_VAULT_SEED, WORLD_SEED,
};

/// Economy root. Created once; its admin gates bootstrap and reset.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuthorityRecord {
    pub admin: Address,
}

impl AuthorityRecord {
    pub fn derive(program: &Address) -> Address {
        derive_address(program, &[AUTHORITY_SEED])
    }
}

impl RecordData for AuthorityRecord {
    const KIND: u8 = KIND_AUTHORITY;
}

/// Toll sink for one token kind. The derived address doubles as the
/// holder of the vault's token holding.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct VaultRecord {
    pub token_kind: TokenKind,
}

impl VaultRecord {
    pub fn derive(program: &Address, kind: TokenKind) -> Address {
        derive_address(program, &[TOKEN_VAULT_SEED, kind.seed()])
    }
}

impl RecordData for VaultRecord {
    const KIND: u8 = KIND_VAULT;
}

/// Reward fund the targets pay out of. Spawn fees flow back in.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardVaultRecord {}

impl RewardVaultRecord {
    pub fn derive(program: &Address) -> Address {
        derive_address(program, &[REWARD_VAULT_SEED])
    }
}

impl RecordData for RewardVaultRecord {
    const KIND: u8 = KIND_REWARD_VAULT;
}

/// One environmental reward target (a treasure chest)
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Target {
    /// Position on the world line
    pub position: u32,
    /// Gold paid when the target is first hit
    pub reward: u64,
    /// Claimed targets stay in the list but no longer pay
    pub depleted: bool,
}

/// Shared world state, a singleton per deployment
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct WorldRecord {
    pub admin: Address,
    /// Inclusive upper bound of the playable line `[0, bound]`
    pub bound: u32,
    /// Generator state advanced by every seeded target placement
    pub rng_state: u64,
    /// Targets claimed since world creation; survives resets
    pub chests_opened: u64,
    pub targets: Vec<Target>,
}

impl WorldRecord {
    pub fn derive(program: &Address) -> Address {
        derive_address(program, &[WORLD_SEED])
    }

    pub fn target(&self, index: u32) -> Option<&Target> {
        self.targets.get(index as usize)
    }

    /// Fresh players appear at the middle of the line
    pub fn default_spawn(&self) -> u32 {
        self.bound / 2
    }

    pub fn in_bounds(&self, candidate: i64) -> bool {
        candidate >= 0 && candidate <= self.bound as i64
    }
}

impl RecordData for WorldRecord {
    const KIND: u8 = KIND_WORLD;
}

/// Action kinds recorded in the history ledger
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    UpgradeShip,
    Move,
    Shoot,
    AreaAttack,
}

/// What a ledgered action did
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Upgraded { level: u16 },
    Moved { position: u32 },
    Shot { hit: bool, payout: u64 },
    Area { targets_hit: u32, payout: u64 },
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Dense sequence number, no gaps
    pub seq: u64,
    pub player: Address,
    pub kind: ActionKind,
    pub outcome: Outcome,
    /// Engine wall clock at commit
    pub at: i64,
}

/// Append-only action history, a singleton per deployment
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerRecord {
    /// Sequence number the next entry will take
    pub next_seq: u64,
    pub entries: Vec<LedgerEntry>,
}

impl LedgerRecord {
    pub fn derive(program: &Address) -> Address {
        derive_address(program, &[LEDGER_SEED])
    }

    /// Append one entry; `None` when the sequence counter would wrap
    pub fn append(
        &mut self,
        player: Address,
        kind: ActionKind,
        outcome: Outcome,
        at: i64,
    ) -> Option<u64> {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.checked_add(1)?;
        self.entries.push(LedgerEntry {
            seq,
            player,
            kind,
            outcome,
            at,
        });
        Some(seq)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LedgerEntry> {
        self.entries.last()
    }
}

impl RecordData for LedgerRecord {
    const KIND: u8 = KIND_LEDGER;
}

/// Per-player ship, one per owner
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShipRecord {
    pub owner: Address,
    /// Levels start at 1
    pub level: u16,
}

impl ShipRecord {
    pub fn derive(program: &Address, player: &Address) -> Address {
        derive_address(program, &[SHIP_SEED, player.as_ref()])
    }
}

impl RecordData for ShipRecord {
    const KIND: u8 = KIND_SHIP;
}

/// Per-player presence in the world
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlayerRecord {
    pub owner: Address,
    /// Caller-supplied avatar reference, opaque to the rules
    pub avatar: Address,
    pub position: u32,
    /// Shots remaining, snapshotted from the Cannon holding at spawn
    pub ammo: u64,
    /// Area-attack charges, snapshotted from the Rum holding at spawn
    pub consumables: u64,
}

impl PlayerRecord {
    pub fn derive(program: &Address, player: &Address) -> Address {
        derive_address(program, &[PLAYER_SEED, player.as_ref()])
    }
}

impl RecordData for PlayerRecord {
    const KIND: u8 = KIND_PLAYER;
}
