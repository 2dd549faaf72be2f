//! Record envelopes
//!
//! Everything the engine stores is a `StoredRecord`: the owning program,
//! a program-defined kind tag, and the borsh payload. Typed access goes
//! through `RecordData`, which binds a state struct to its kind tag so a
//! record can never be silently reinterpreted as a different kind.

use crate::{error::EngineError, keys::Address};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Typed record payload with a program-defined kind tag
pub trait RecordData: BorshSerialize + BorshDeserialize {
    /// Kind tag, unique per record shape within a program
    const KIND: u8;
}

/// A record as held by the store
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRecord {
    /// Program that owns this record
    pub program: Address,
    /// Program-defined kind tag
    pub kind: u8,
    /// Borsh-encoded payload
    pub data: Vec<u8>,
}

impl StoredRecord {
    /// Encode a typed payload into an envelope owned by `program`
    pub fn encode<T: RecordData>(program: Address, value: &T) -> Result<Self, EngineError> {
        let data = borsh::to_vec(value).map_err(|e| EngineError::Serialization(e.to_string()))?;
        Ok(Self {
            program,
            kind: T::KIND,
            data,
        })
    }

    /// Whether this envelope holds a `T` owned by `program`
    pub fn matches<T: RecordData>(&self, program: &Address) -> bool {
        self.program == *program && self.kind == T::KIND
    }

    /// Decode the payload without checking kind or owner.
    ///
    /// Callers must check `matches` first and fail closed on a mismatch.
    pub fn decode_payload<T: RecordData>(&self, record: &Address) -> Result<T, EngineError> {
        T::try_from_slice(&self.data).map_err(|_| EngineError::InvalidAccount { record: *record })
    }
}
