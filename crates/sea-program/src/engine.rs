//! Typed facade over the hosted program
//!
//! Wraps a runtime `Engine` with the game program registered and exposes
//! one method per operation plus read helpers. Tests and embedders drive
//! this directly; the node hands the inner engine to a tick producer and
//! submits requests built with `GameInstruction::into_request`.

use std::sync::Arc;

use sea_runtime::{Address, Engine, RecordData, RecordStore, TokenKind, TokenLedger};

use crate::{
    error::GameError,
    instruction::GameInstruction,
    params::{GameParams, ParamsError},
    processor::SeaProgram,
    state::{
        LedgerRecord, PlayerRecord, RewardVaultRecord, ShipRecord, VaultRecord, WorldRecord,
    },
};

pub struct GameEngine {
    engine: Engine,
    program: Address,
    params: GameParams,
}

impl GameEngine {
    /// Engine over fresh in-memory state
    pub fn new(params: GameParams) -> Result<Self, ParamsError> {
        Self::with_parts(
            params,
            Arc::new(RecordStore::new()),
            Arc::new(TokenLedger::new()),
        )
    }

    /// Engine over an existing store and token ledger, typically
    /// restored from disk
    pub fn with_parts(
        params: GameParams,
        store: Arc<RecordStore>,
        tokens: Arc<TokenLedger>,
    ) -> Result<Self, ParamsError> {
        let program = crate::id();
        let builtin = SeaProgram::new(params.clone())?;
        let mut engine = Engine::new(store, tokens);
        engine.register_builtin(program, Arc::new(builtin));
        Ok(Self {
            engine,
            program,
            params,
        })
    }

    pub fn program(&self) -> Address {
        self.program
    }

    pub fn params(&self) -> &GameParams {
        &self.params
    }

    pub fn store(&self) -> Arc<RecordStore> {
        self.engine.store()
    }

    pub fn tokens(&self) -> Arc<TokenLedger> {
        self.engine.tokens()
    }

    /// Hand the inner engine to a tick producer
    pub fn into_engine(self) -> Engine {
        self.engine
    }

    pub fn advance_tick(&mut self) {
        self.engine.advance_tick();
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    pub fn initialize(&mut self, admin: Address) -> Result<(), GameError> {
        self.execute(admin, GameInstruction::Initialize)
    }

    pub fn initialize_game_actions(&mut self, admin: Address) -> Result<(), GameError> {
        self.execute(admin, GameInstruction::InitializeGameActions)
    }

    pub fn initialize_game_data(
        &mut self,
        admin: Address,
        bound: u32,
        chest_count: u32,
        seed: u64,
    ) -> Result<(), GameError> {
        self.execute(
            admin,
            GameInstruction::InitializeGameData {
                bound,
                chest_count,
                seed,
            },
        )
    }

    /// Economy, ledger, and world in one call, for a fresh deployment
    pub fn bootstrap(
        &mut self,
        admin: Address,
        bound: u32,
        chest_count: u32,
        seed: u64,
    ) -> Result<(), GameError> {
        self.initialize(admin)?;
        self.initialize_game_actions(admin)?;
        self.initialize_game_data(admin, bound, chest_count, seed)
    }

    pub fn initialize_ship(&mut self, player: Address) -> Result<(), GameError> {
        self.execute(player, GameInstruction::InitializeShip)
    }

    pub fn upgrade_ship(&mut self, player: Address) -> Result<(), GameError> {
        self.execute(player, GameInstruction::UpgradeShip)
    }

    pub fn spawn_player(&mut self, player: Address, avatar: Address) -> Result<(), GameError> {
        self.execute(player, GameInstruction::SpawnPlayer { avatar })
    }

    pub fn despawn_player(&mut self, player: Address) -> Result<(), GameError> {
        self.execute(player, GameInstruction::DespawnPlayer)
    }

    pub fn move_player(&mut self, player: Address, steps: i32) -> Result<(), GameError> {
        self.execute(player, GameInstruction::MovePlayer { steps })
    }

    pub fn shoot(&mut self, player: Address, target_index: u32) -> Result<(), GameError> {
        self.execute(player, GameInstruction::Shoot { target_index })
    }

    pub fn area_attack(&mut self, player: Address, target_index: u32) -> Result<(), GameError> {
        self.execute(player, GameInstruction::AreaAttack { target_index })
    }

    pub fn reset_world(
        &mut self,
        admin: Address,
        chest_count: u32,
        seed: u64,
    ) -> Result<(), GameError> {
        self.execute(admin, GameInstruction::ResetWorld { chest_count, seed })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn world(&self) -> Result<WorldRecord, GameError> {
        self.read(WorldRecord::derive(&self.program))
    }

    pub fn ledger(&self) -> Result<LedgerRecord, GameError> {
        self.read(LedgerRecord::derive(&self.program))
    }

    pub fn ship(&self, player: &Address) -> Result<ShipRecord, GameError> {
        self.read(ShipRecord::derive(&self.program, player))
    }

    pub fn player(&self, player: &Address) -> Result<PlayerRecord, GameError> {
        self.read(PlayerRecord::derive(&self.program, player))
    }

    pub fn balance(&self, kind: TokenKind, holder: &Address) -> u64 {
        self.engine.tokens().balance(kind, holder)
    }

    /// Toll vault address for a token kind
    pub fn vault_address(&self, kind: TokenKind) -> Address {
        VaultRecord::derive(&self.program, kind)
    }

    /// Reward vault address; targets pay out of this holding
    pub fn reward_vault(&self) -> Address {
        RewardVaultRecord::derive(&self.program)
    }

    /// Mint tokens to a holder. This is the funding path for deployments
    /// and tests; gameplay itself never mints.
    pub fn fund(&self, kind: TokenKind, holder: Address, amount: u64) -> Result<(), GameError> {
        self.engine
            .tokens()
            .mint(kind, holder, amount)
            .map_err(GameError::from)
    }

    fn execute(&mut self, signer: Address, instruction: GameInstruction) -> Result<(), GameError> {
        let request = instruction.into_request(signer)?;
        self.engine.execute(&request).map_err(GameError::from)
    }

    fn read<T: RecordData>(&self, address: Address) -> Result<T, GameError> {
        let record = self
            .engine
            .store()
            .get(&address)
            .ok_or(GameError::AccountNotInitialized { record: address })?;
        if !record.matches::<T>(&self.program) {
            return Err(GameError::InvalidAccount { record: address });
        }
        record.decode_payload(&address).map_err(GameError::from)
    }
}
