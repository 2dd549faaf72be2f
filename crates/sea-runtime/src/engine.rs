//! Single-writer execution engine
//!
//! The engine owns the clock and is the only component that commits
//! staged effects into the record store and token ledger. Execution
//! requires `&mut Engine`, so units of work are serialized structurally;
//! there is no interleaving to reason about and admission order is
//! execution order.

use crate::{
    context::{ActionContext, Clock},
    error::EngineError,
    keys::Address,
    store::RecordStore,
    tokens::TokenLedger,
};
use std::{collections::HashMap, sync::Arc};

/// A program hosted inside the engine.
///
/// `process` runs against a staging context; returning `Err` discards
/// every staged record write and token movement of the unit of work.
pub trait BuiltinProgram: Send + Sync {
    fn process(&self, ctx: &mut ActionContext<'_>, data: &[u8]) -> Result<(), EngineError>;
}

/// A signed unit of work addressed to a hosted program
#[derive(Clone, Debug)]
pub struct ActionRequest {
    pub program: Address,
    pub signer: Address,
    pub data: Vec<u8>,
}

/// Deterministic state machine hosting builtin programs
pub struct Engine {
    store: Arc<RecordStore>,
    tokens: Arc<TokenLedger>,
    builtins: HashMap<Address, Arc<dyn BuiltinProgram>>,
    tick: u64,
    unix_timestamp: i64,
}

impl Engine {
    pub fn new(store: Arc<RecordStore>, tokens: Arc<TokenLedger>) -> Self {
        Self {
            store,
            tokens,
            builtins: HashMap::new(),
            tick: 0,
            unix_timestamp: now_ts(),
        }
    }

    /// Register a program at its address
    pub fn register_builtin(&mut self, program: Address, builtin: Arc<dyn BuiltinProgram>) {
        tracing::debug!("engine: registered builtin program {program}");
        self.builtins.insert(program, builtin);
    }

    /// Execute one unit of work to completion.
    ///
    /// On `Ok` the staged effects are committed before this returns; on
    /// `Err` nothing is committed and the error describes the first
    /// check that failed.
    pub fn execute(&mut self, request: &ActionRequest) -> Result<(), EngineError> {
        let builtin = self
            .builtins
            .get(&request.program)
            .cloned()
            .ok_or(EngineError::UnknownProgram {
                program: request.program,
            })?;

        let clock = Clock {
            tick: self.tick,
            unix_timestamp: self.unix_timestamp,
        };
        let mut ctx = ActionContext::new(
            &self.store,
            &self.tokens,
            request.program,
            request.signer,
            clock,
        );
        builtin.process(&mut ctx, &request.data)?;

        let effects = ctx.into_effects();
        for address in &effects.removals {
            self.store.remove(address);
        }
        self.store
            .insert_batch(effects.records.into_iter().collect(), self.tick);
        self.tokens.apply_committed(effects.balances);
        Ok(())
    }

    /// Advance the tick counter and refresh the wall clock
    pub fn advance_tick(&mut self) {
        self.tick += 1;
        self.unix_timestamp = now_ts();
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Resume the tick counter after loading persisted state
    pub fn restore_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    pub fn store(&self) -> Arc<RecordStore> {
        Arc::clone(&self.store)
    }

    pub fn tokens(&self) -> Arc<TokenLedger> {
        Arc::clone(&self.tokens)
    }
}

fn now_ts() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordData;
    use crate::tokens::TokenKind;
    use borsh::{BorshDeserialize, BorshSerialize};

    #[derive(BorshSerialize, BorshDeserialize, Debug, PartialEq)]
    struct Counter {
        hits: u64,
    }

    impl RecordData for Counter {
        const KIND: u8 = 220;
    }

    /// Bumps a counter record; closes it or fails if asked to.
    struct BumpProgram;

    impl BuiltinProgram for BumpProgram {
        fn process(&self, ctx: &mut ActionContext<'_>, data: &[u8]) -> Result<(), EngineError> {
            let address = Address::from_label(b"counter");
            if data == b"close" {
                return ctx.close::<Counter>(&address);
            }
            let mut counter = if ctx.record_exists(&address) {
                ctx.load::<Counter>(&address)?
            } else {
                Counter { hits: 0 }
            };
            counter.hits += 1;
            ctx.save(address, &counter)?;

            // Also move some gold so failure has token effects to discard.
            let vault = Address::from_label(b"bump_vault");
            ctx.charge_toll(TokenKind::Gold, vault, 5)?;

            if data == b"fail" {
                return Err(EngineError::InvalidInstructionData);
            }
            Ok(())
        }
    }

    fn engine_with_bump() -> (Engine, Address) {
        let store = Arc::new(RecordStore::new());
        let tokens = Arc::new(TokenLedger::new());
        let program = Address::from_label(b"bump_program");
        let mut engine = Engine::new(store, tokens);
        engine.register_builtin(program, Arc::new(BumpProgram));
        engine
            .tokens()
            .open_holding(TokenKind::Gold, Address::from_label(b"bump_vault"));
        (engine, program)
    }

    #[test]
    fn test_execute_commits_on_success() {
        let (mut engine, program) = engine_with_bump();
        let signer = Address::new_unique();
        engine
            .tokens()
            .mint(TokenKind::Gold, signer, 100)
            .unwrap();

        let request = ActionRequest {
            program,
            signer,
            data: Vec::new(),
        };
        engine.execute(&request).unwrap();
        engine.execute(&request).unwrap();

        let record = engine.store().get(&Address::from_label(b"counter")).unwrap();
        let counter: Counter = record.decode_payload(&Address::from_label(b"counter")).unwrap();
        assert_eq!(counter.hits, 2);
        assert_eq!(engine.tokens().balance(TokenKind::Gold, &signer), 90);
    }

    #[test]
    fn test_execute_discards_on_failure() {
        let (mut engine, program) = engine_with_bump();
        let signer = Address::new_unique();
        engine
            .tokens()
            .mint(TokenKind::Gold, signer, 100)
            .unwrap();

        let err = engine
            .execute(&ActionRequest {
                program,
                signer,
                data: b"fail".to_vec(),
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInstructionData));

        // No counter record, no gold moved.
        assert!(engine.store().get(&Address::from_label(b"counter")).is_none());
        assert_eq!(engine.tokens().balance(TokenKind::Gold, &signer), 100);
        assert_eq!(
            engine
                .tokens()
                .balance(TokenKind::Gold, &Address::from_label(b"bump_vault")),
            0
        );
    }

    #[test]
    fn test_execute_applies_staged_removals() {
        let (mut engine, program) = engine_with_bump();
        let signer = Address::new_unique();
        engine
            .tokens()
            .mint(TokenKind::Gold, signer, 100)
            .unwrap();
        let counter_address = Address::from_label(b"counter");

        let bump = ActionRequest {
            program,
            signer,
            data: Vec::new(),
        };
        engine.execute(&bump).unwrap();
        assert!(engine.store().contains(&counter_address));

        engine
            .execute(&ActionRequest {
                program,
                signer,
                data: b"close".to_vec(),
            })
            .unwrap();
        assert!(engine.store().get(&counter_address).is_none());

        // The counter starts over once the record is gone
        engine.execute(&bump).unwrap();
        let record = engine.store().get(&counter_address).unwrap();
        let counter: Counter = record.decode_payload(&counter_address).unwrap();
        assert_eq!(counter.hits, 1);
    }

    #[test]
    fn test_unknown_program_is_rejected() {
        let store = Arc::new(RecordStore::new());
        let tokens = Arc::new(TokenLedger::new());
        let mut engine = Engine::new(store, tokens);

        let err = engine
            .execute(&ActionRequest {
                program: Address::new_unique(),
                signer: Address::new_unique(),
                data: Vec::new(),
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownProgram { .. }));
    }

    #[test]
    fn test_tick_advances_and_restores() {
        let store = Arc::new(RecordStore::new());
        let tokens = Arc::new(TokenLedger::new());
        let mut engine = Engine::new(store, tokens);
        assert_eq!(engine.tick(), 0);

        engine.advance_tick();
        engine.advance_tick();
        assert_eq!(engine.tick(), 2);

        engine.restore_tick(40);
        assert_eq!(engine.tick(), 40);
    }
}
