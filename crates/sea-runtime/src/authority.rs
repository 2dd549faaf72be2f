//! Economy authority capability
//!
//! A program never holds a private key for its vaults. Instead, spends
//! out of program-custodied holdings are authorized by an
//! `EconomyAuthority` value that only the engine can construct, and only
//! while executing a unit of work. Code outside that path has no way to
//! produce the capability, so it has no way to debit a vault.

use crate::{keys::Address, record::StoredRecord};

/// Capability to move funds out of program-custodied holdings.
///
/// Constructed by the engine when a unit of work starts and dropped with
/// the staging context when it ends. The capability is scoped to one
/// program: it controls exactly the holdings whose holder address carries
/// a record owned by that program.
pub struct EconomyAuthority {
    program: Address,
}

impl EconomyAuthority {
    pub(crate) fn new(program: Address) -> Self {
        Self { program }
    }

    /// Program this capability is scoped to
    pub fn program(&self) -> &Address {
        &self.program
    }

    /// Whether the given record is custodied by this authority
    pub fn controls(&self, record: &StoredRecord) -> bool {
        record.program == self.program
    }
}
