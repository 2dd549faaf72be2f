//! Action surface
//!
//! One enum variant per game operation. Requests arrive as the borsh
//! encoding of this enum; the processor rejects anything that does not
//! parse. Doc comments list the records each operation touches and who
//! may sign it.

use borsh::{BorshDeserialize, BorshSerialize};
use sea_runtime::{ActionRequest, Address, EngineError};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum GameInstruction {
    /// Bootstrap the economy.
    ///
    /// Creates the authority record (admin = signer), the reward vault,
    /// and one toll vault per token kind, opening each vault's holding.
    Initialize,

    /// Bootstrap the action history.
    ///
    /// Signer: admin. Creates the empty ledger record.
    InitializeGameActions,

    /// Bootstrap the world contents.
    ///
    /// Signer: admin. Creates the world record with `chest_count`
    /// seeded targets on `[0, bound]`.
    InitializeGameData {
        bound: u32,
        chest_count: u32,
        seed: u64,
    },

    /// Create the signer's ship at level 1.
    InitializeShip,

    /// Raise the signer's ship one level for `cost(level)` gold,
    /// paid into the gold toll vault.
    UpgradeShip,

    /// Enter the world.
    ///
    /// Creates the signer's player record at the default spawn point,
    /// snapshots combat resources from the signer's holdings, charges
    /// the spawn fee into the reward vault, and places one fresh target.
    SpawnPlayer { avatar: Address },

    /// Leave the world.
    ///
    /// Removes the signer's player record. The ship and all holdings
    /// survive, so a later `SpawnPlayer` re-enters with fresh snapshots.
    DespawnPlayer,

    /// Step along the world line; tolls per step regardless of direction.
    MovePlayer { steps: i32 },

    /// Fire at a target. Spends one ammo and the shot toll whether or
    /// not the shot lands; a hit pays the target's reward.
    Shoot { target_index: u32 },

    /// Area variant of `Shoot`. Spends one rum charge and the larger
    /// area toll; a hit also sweeps nearby targets at a scaled reward.
    AreaAttack { target_index: u32 },

    /// Replace the target list with a fresh seeded set.
    ///
    /// Signer: admin. Bound and lifetime counters survive.
    ResetWorld { chest_count: u32, seed: u64 },
}

impl GameInstruction {
    /// Package as a signed request for the hosted program
    pub fn into_request(self, signer: Address) -> Result<ActionRequest, EngineError> {
        let data =
            borsh::to_vec(&self).map_err(|err| EngineError::Serialization(err.to_string()))?;
        Ok(ActionRequest {
            program: crate::id(),
            signer,
            data,
        })
    }
}
