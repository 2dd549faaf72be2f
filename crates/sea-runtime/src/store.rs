//! In-memory record storage using DashMap for concurrent access

use crate::{keys::Address, record::StoredRecord};
use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe in-memory record storage
///
/// Uses DashMap for lock-free concurrent reads and fine-grained write
/// locks. Writes flow through the engine commit path; everyone else holds
/// this for reads.
#[derive(Clone)]
pub struct RecordStore {
    /// Main record storage
    records: Arc<DashMap<Address, StoredRecord>>,
    /// Tick at which each record was last written
    record_ticks: Arc<DashMap<Address, u64>>,
}

impl RecordStore {
    /// Create a new empty record store
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            record_ticks: Arc::new(DashMap::new()),
        }
    }

    /// Get a record by address
    pub fn get(&self, address: &Address) -> Option<StoredRecord> {
        self.records.get(address).map(|r| r.value().clone())
    }

    /// Get a record with the tick it was last written
    pub fn get_with_tick(&self, address: &Address) -> Option<(StoredRecord, u64)> {
        let record = self.records.get(address)?;
        let tick = self.record_ticks.get(address).map(|t| *t).unwrap_or(0);
        Some((record.value().clone(), tick))
    }

    /// Store a record
    pub fn insert(&self, address: Address, record: StoredRecord, tick: u64) {
        self.records.insert(address, record);
        self.record_ticks.insert(address, tick);
    }

    /// Store a batch of records from one committed unit of work
    pub fn insert_batch(&self, records: Vec<(Address, StoredRecord)>, tick: u64) {
        for (address, record) in records {
            self.insert(address, record, tick);
        }
    }

    /// Check if a record exists
    pub fn contains(&self, address: &Address) -> bool {
        self.records.contains_key(address)
    }

    /// All record addresses (for persistence and debugging)
    pub fn all_addresses(&self) -> Vec<Address> {
        self.records.iter().map(|r| *r.key()).collect()
    }

    /// Records owned by a specific program
    pub fn records_for_program(&self, program: &Address) -> Vec<(Address, StoredRecord)> {
        self.records
            .iter()
            .filter(|r| r.value().program == *program)
            .map(|r| (*r.key(), r.value().clone()))
            .collect()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove a record
    pub fn remove(&self, address: &Address) -> Option<StoredRecord> {
        self.record_ticks.remove(address);
        self.records.remove(address).map(|(_, v)| v)
    }

    /// Clear all records (for testing)
    pub fn clear(&self) {
        self.records.clear();
        self.record_ticks.clear();
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}
