//! Write-ahead staging for one unit of work
//!
//! A builtin never touches the store or the token ledger directly. All
//! reads go through the `ActionContext`, all writes land in its staging
//! buffers, and the engine applies the buffers only if the builtin
//! returns `Ok`. On any error the buffers are dropped whole: no partial
//! record write, no partial token movement, no orphan ledger entry.

use crate::{
    authority::EconomyAuthority,
    error::EngineError,
    keys::Address,
    record::{RecordData, StoredRecord},
    store::RecordStore,
    tokens::{HoldingKey, TokenKind, TokenLedger},
};
use std::collections::{BTreeMap, BTreeSet};

/// Engine time observed by a unit of work
#[derive(Clone, Copy, Debug, Default)]
pub struct Clock {
    /// Current engine tick
    pub tick: u64,
    /// Wall-clock seconds at the start of the tick
    pub unix_timestamp: i64,
}

/// Staged mutations from one committed unit of work.
///
/// `records` and `removals` never share an address.
pub(crate) struct StagedEffects {
    pub(crate) records: BTreeMap<Address, StoredRecord>,
    pub(crate) removals: BTreeSet<Address>,
    pub(crate) balances: BTreeMap<HoldingKey, u64>,
}

/// Execution context for a single unit of work
pub struct ActionContext<'a> {
    store: &'a RecordStore,
    tokens: &'a TokenLedger,
    program: Address,
    signer: Address,
    clock: Clock,
    authority: EconomyAuthority,
    staged_records: BTreeMap<Address, StoredRecord>,
    staged_removals: BTreeSet<Address>,
    staged_balances: BTreeMap<HoldingKey, u64>,
}

impl<'a> ActionContext<'a> {
    pub(crate) fn new(
        store: &'a RecordStore,
        tokens: &'a TokenLedger,
        program: Address,
        signer: Address,
        clock: Clock,
    ) -> Self {
        Self {
            store,
            tokens,
            program,
            signer,
            clock,
            authority: EconomyAuthority::new(program),
            staged_records: BTreeMap::new(),
            staged_removals: BTreeSet::new(),
            staged_balances: BTreeMap::new(),
        }
    }

    /// Program executing this unit of work
    pub fn program(&self) -> Address {
        self.program
    }

    /// Identity that signed this unit of work
    pub fn signer(&self) -> Address {
        self.signer
    }

    /// Engine time for this unit of work
    pub fn clock(&self) -> Clock {
        self.clock
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Whether a record exists, counting writes and removals staged in
    /// this unit
    pub fn record_exists(&self, address: &Address) -> bool {
        if self.staged_removals.contains(address) {
            return false;
        }
        self.staged_records.contains_key(address) || self.store.contains(address)
    }

    /// Create a record; fails if one already exists at the address
    pub fn create<T: RecordData>(&mut self, address: Address, value: &T) -> Result<(), EngineError> {
        if self.record_exists(&address) {
            return Err(EngineError::AlreadyInitialized { record: address });
        }
        let record = StoredRecord::encode(self.program, value)?;
        self.staged_removals.remove(&address);
        self.staged_records.insert(address, record);
        Ok(())
    }

    /// Load a typed record, preferring writes staged in this unit.
    ///
    /// A record of the wrong kind or owner at the address fails closed
    /// with `InvalidAccount`; an absent record is `NotInitialized`.
    pub fn load<T: RecordData>(&self, address: &Address) -> Result<T, EngineError> {
        if self.staged_removals.contains(address) {
            return Err(EngineError::NotInitialized { record: *address });
        }
        let record = match self.staged_records.get(address) {
            Some(staged) => staged.clone(),
            None => self
                .store
                .get(address)
                .ok_or(EngineError::NotInitialized { record: *address })?,
        };
        if !record.matches::<T>(&self.program) {
            return Err(EngineError::InvalidAccount { record: *address });
        }
        record.decode_payload(address)
    }

    /// Stage the new contents of a record
    pub fn save<T: RecordData>(&mut self, address: Address, value: &T) -> Result<(), EngineError> {
        let record = StoredRecord::encode(self.program, value)?;
        self.staged_removals.remove(&address);
        self.staged_records.insert(address, record);
        Ok(())
    }

    /// Remove a record, with the same kind and custody checks as `load`.
    ///
    /// The removal is staged like any other write; a failing unit of
    /// work leaves the record in place.
    pub fn close<T: RecordData>(&mut self, address: &Address) -> Result<(), EngineError> {
        if self.staged_removals.contains(address) {
            return Err(EngineError::NotInitialized { record: *address });
        }
        let record = match self.staged_records.get(address) {
            Some(staged) => staged.clone(),
            None => self
                .store
                .get(address)
                .ok_or(EngineError::NotInitialized { record: *address })?,
        };
        if !record.matches::<T>(&self.program) {
            return Err(EngineError::InvalidAccount { record: *address });
        }
        self.staged_records.remove(address);
        self.staged_removals.insert(*address);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Token holdings
    // ------------------------------------------------------------------

    /// Balance of a holding, counting transfers staged in this unit
    pub fn balance(&self, kind: TokenKind, holder: &Address) -> u64 {
        self.staged_balances
            .get(&(kind, *holder))
            .copied()
            .unwrap_or_else(|| self.tokens.balance(kind, holder))
    }

    /// Whether a holding is open, counting holdings opened in this unit
    pub fn holding_exists(&self, kind: TokenKind, holder: &Address) -> bool {
        self.staged_balances.contains_key(&(kind, *holder))
            || self.tokens.holding_exists(kind, holder)
    }

    /// Open a holding at its current balance; no-op if already open
    pub fn open_holding(&mut self, kind: TokenKind, holder: Address) {
        let current = self.balance(kind, &holder);
        self.staged_balances.entry((kind, holder)).or_insert(current);
    }

    /// Charge a toll: debit the signer's holding, credit the vault holding.
    ///
    /// The debit is authorized by the signer having submitted this unit of
    /// work; the transfer itself is mediated here, inside the core path.
    pub fn charge_toll(
        &mut self,
        kind: TokenKind,
        vault: Address,
        amount: u64,
    ) -> Result<(), EngineError> {
        if amount == 0 {
            return Ok(());
        }
        let payer = self.signer;
        self.debit(kind, payer, amount)?;
        self.credit(kind, vault, amount)
    }

    /// Pay out of a program-custodied holding.
    ///
    /// Succeeds only when the holder address carries a record custodied by
    /// this unit's `EconomyAuthority`; any other source is `Unauthorized`.
    pub fn authorize_payout(
        &mut self,
        kind: TokenKind,
        vault: Address,
        to: Address,
        amount: u64,
    ) -> Result<(), EngineError> {
        if amount == 0 {
            return Ok(());
        }
        if self.staged_removals.contains(&vault) {
            return Err(EngineError::NotInitialized { record: vault });
        }
        let record = match self.staged_records.get(&vault) {
            Some(staged) => staged.clone(),
            None => self
                .store
                .get(&vault)
                .ok_or(EngineError::NotInitialized { record: vault })?,
        };
        if !self.authority.controls(&record) {
            return Err(EngineError::Unauthorized { record: vault });
        }
        self.debit(kind, vault, amount)?;
        self.credit(kind, to, amount)
    }

    fn debit(&mut self, kind: TokenKind, holder: Address, amount: u64) -> Result<(), EngineError> {
        let available = self.balance(kind, &holder);
        let remaining = available
            .checked_sub(amount)
            .ok_or(EngineError::InsufficientFunds {
                holder,
                needed: amount,
                available,
            })?;
        self.staged_balances.insert((kind, holder), remaining);
        Ok(())
    }

    fn credit(&mut self, kind: TokenKind, holder: Address, amount: u64) -> Result<(), EngineError> {
        if !self.holding_exists(kind, &holder) {
            return Err(EngineError::NotInitialized { record: holder });
        }
        let current = self.balance(kind, &holder);
        let updated = current
            .checked_add(amount)
            .ok_or(EngineError::Overflow { holder })?;
        self.staged_balances.insert((kind, holder), updated);
        Ok(())
    }

    pub(crate) fn into_effects(self) -> StagedEffects {
        StagedEffects {
            records: self.staged_records,
            removals: self.staged_removals,
            balances: self.staged_balances,
        }
    }
}
