//! Record addresses and deterministic derivation
//!
//! Every record and participant is identified by a 32-byte `Address`.
//! Program-owned records live at addresses derived from the owning program
//! plus a fixed label, so anyone holding the label can recompute the
//! address without any key material existing for it.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Domain tag mixed into every derived record address
const DERIVE_DOMAIN: &[u8] = b"sea:record:v1";

/// Domain tag for label-only identities (program ids, fixed participants)
const LABEL_DOMAIN: &[u8] = b"sea:label:v1";

/// Domain tag for process-locally unique addresses
const UNIQUE_DOMAIN: &[u8] = b"sea:unique:v1";

/// 32-byte identity for records, programs, and participants
#[derive(
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Build an address from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes of the address
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Deterministic identity for a fixed label (program ids, well-known roles)
    pub fn from_label(label: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(LABEL_DOMAIN);
        hasher.update(label);
        Self(*hasher.finalize().as_bytes())
    }

    /// Process-locally unique address for tests and ad-hoc identities
    pub fn new_unique() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new();
        hasher.update(UNIQUE_DOMAIN);
        hasher.update(&n.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

/// Derive the canonical record address for `seeds` under `program`.
///
/// Seeds are length-prefixed before hashing so that distinct seed splits
/// can never collide. The derivation is pure: no key material is created
/// and no bump search is needed.
pub fn derive_address(program: &Address, seeds: &[&[u8]]) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DERIVE_DOMAIN);
    hasher.update(&program.0);
    for seed in seeds {
        hasher.update(&(seed.len() as u16).to_le_bytes());
        hasher.update(seed);
    }
    Address(*hasher.finalize().as_bytes())
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

/// Failed to parse a base58 address string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("invalid base58: {0}")]
    InvalidBase58(String),
    #[error("decoded length {0}, expected 32 bytes")]
    WrongLength(usize),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| AddressParseError::InvalidBase58(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError::WrongLength(bytes.len()))?;
        Ok(Address(arr))
    }
}
