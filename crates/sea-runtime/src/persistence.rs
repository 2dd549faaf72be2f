//! Persistence layer for engine state
//!
//! Uses sled embedded database to persist records, token holdings, and
//! the tick counter across restarts. State is saved periodically and on
//! shutdown.

use crate::{
    keys::Address,
    record::StoredRecord,
    store::RecordStore,
    tokens::{TokenKind, TokenLedger},
};
use serde::{Deserialize, Serialize};
use sled::Db;
use std::collections::HashSet;
use std::path::Path;

/// Metadata about the persisted engine state
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct EngineMetadata {
    /// Tick the engine had reached at save time
    pub tick: u64,
    /// Total records stored
    pub record_count: u64,
    /// Last save timestamp
    pub last_save_ts: i64,
}

/// Persistent storage for engine state
pub struct PersistentStore {
    /// Sled database instance
    db: Db,
    /// Records tree
    records: sled::Tree,
    /// Record ticks tree (tracks when each record was last written)
    record_ticks: sled::Tree,
    /// Token holdings tree
    balances: sled::Tree,
    /// Metadata tree
    metadata: sled::Tree,
}

impl PersistentStore {
    /// Open or create a persistent store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let db = sled::open(&path)?;
        let records = db.open_tree("records")?;
        let record_ticks = db.open_tree("record_ticks")?;
        let balances = db.open_tree("balances")?;
        let metadata = db.open_tree("metadata")?;

        tracing::info!("Opened persistent store at {:?}", path.as_ref());

        Ok(Self {
            db,
            records,
            record_ticks,
            balances,
            metadata,
        })
    }

    /// Store a record
    pub fn store_record(
        &self,
        address: &Address,
        record: &StoredRecord,
        tick: u64,
    ) -> anyhow::Result<()> {
        let record_bytes = bincode::serialize(record)?;
        self.records.insert(address.as_ref(), record_bytes)?;

        let tick_bytes = tick.to_le_bytes();
        self.record_ticks.insert(address.as_ref(), &tick_bytes)?;

        Ok(())
    }

    /// Get a record
    pub fn get_record(&self, address: &Address) -> anyhow::Result<Option<StoredRecord>> {
        match self.records.get(address.as_ref())? {
            Some(bytes) => {
                let record: StoredRecord = bincode::deserialize(&bytes)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Remove a record
    pub fn remove_record(&self, address: &Address) -> anyhow::Result<()> {
        self.records.remove(address.as_ref())?;
        self.record_ticks.remove(address.as_ref())?;
        Ok(())
    }

    /// Remove persisted records whose address is absent from the live set
    pub fn prune_records(&self, live: &HashSet<Address>) -> anyhow::Result<usize> {
        let mut stale = Vec::new();
        for result in self.records.iter().keys() {
            let key = result?;
            let address_bytes: [u8; 32] = key
                .as_ref()
                .try_into()
                .map_err(|_| anyhow::anyhow!("Invalid address length"))?;
            let address = Address::new(address_bytes);
            if !live.contains(&address) {
                stale.push(address);
            }
        }

        for address in &stale {
            self.remove_record(address)?;
        }
        if !stale.is_empty() {
            tracing::debug!("Pruned {} stale records", stale.len());
        }

        Ok(stale.len())
    }

    /// Get all records (for loading into memory)
    pub fn get_all_records(&self) -> anyhow::Result<Vec<(Address, StoredRecord, u64)>> {
        let mut records = Vec::new();

        for result in self.records.iter() {
            let (key, value) = result?;

            let address_bytes: [u8; 32] = key
                .as_ref()
                .try_into()
                .map_err(|_| anyhow::anyhow!("Invalid address length"))?;
            let address = Address::new(address_bytes);

            let record: StoredRecord = bincode::deserialize(&value)?;

            let tick = match self.record_ticks.get(&key)? {
                Some(bytes) => {
                    let arr: [u8; 8] = bytes.as_ref().try_into().unwrap_or([0u8; 8]);
                    u64::from_le_bytes(arr)
                }
                None => 0,
            };

            records.push((address, record, tick));
        }

        Ok(records)
    }

    /// Save all token holdings from the ledger
    pub fn save_balances(&self, ledger: &TokenLedger) -> anyhow::Result<usize> {
        let snapshot = ledger.snapshot();
        let count = snapshot.len();

        for ((kind, holder), amount) in snapshot {
            self.balances
                .insert(holding_key(kind, &holder), &amount.to_le_bytes())?;
        }

        Ok(count)
    }

    /// Load all token holdings into the ledger
    pub fn load_balances(&self, ledger: &TokenLedger) -> anyhow::Result<usize> {
        let mut entries = Vec::new();

        for result in self.balances.iter() {
            let (key, value) = result?;

            if key.len() != 33 {
                anyhow::bail!("Invalid holding key length {}", key.len());
            }
            let kind = TokenKind::from_tag(key[0])
                .ok_or_else(|| anyhow::anyhow!("Unknown token kind tag {}", key[0]))?;
            let holder_bytes: [u8; 32] = key[1..]
                .try_into()
                .map_err(|_| anyhow::anyhow!("Invalid holder length"))?;

            let amount_bytes: [u8; 8] = value
                .as_ref()
                .try_into()
                .map_err(|_| anyhow::anyhow!("Invalid balance length"))?;

            entries.push((
                (kind, Address::new(holder_bytes)),
                u64::from_le_bytes(amount_bytes),
            ));
        }

        let count = entries.len();
        ledger.restore(entries);
        Ok(count)
    }

    /// Save engine metadata
    pub fn save_metadata(&self, metadata: &EngineMetadata) -> anyhow::Result<()> {
        let bytes = bincode::serialize(metadata)?;
        self.metadata.insert("engine", bytes)?;
        Ok(())
    }

    /// Load engine metadata
    pub fn load_metadata(&self) -> anyhow::Result<Option<EngineMetadata>> {
        match self.metadata.get("engine")? {
            Some(bytes) => {
                let metadata: EngineMetadata = bincode::deserialize(&bytes)?;
                Ok(Some(metadata))
            }
            None => Ok(None),
        }
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> anyhow::Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Get the number of stored records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Clear all data (for testing)
    pub fn clear(&self) -> anyhow::Result<()> {
        self.records.clear()?;
        self.record_ticks.clear()?;
        self.balances.clear()?;
        self.metadata.clear()?;
        Ok(())
    }
}

fn holding_key(kind: TokenKind, holder: &Address) -> [u8; 33] {
    let mut key = [0u8; 33];
    key[0] = kind.tag();
    key[1..].copy_from_slice(holder.as_ref());
    key
}

/// Extension trait to add persistence to RecordStore
pub trait RecordStorePersistence {
    /// Mirror the live records to persistent storage. Records removed
    /// from memory since the last save are removed from disk too.
    fn save_to_disk(&self, store: &PersistentStore) -> anyhow::Result<usize>;

    /// Load all records from persistent storage
    fn load_from_disk(&self, store: &PersistentStore) -> anyhow::Result<usize>;
}

impl RecordStorePersistence for RecordStore {
    fn save_to_disk(&self, store: &PersistentStore) -> anyhow::Result<usize> {
        let addresses = self.all_addresses();
        let live: HashSet<Address> = addresses.iter().copied().collect();
        store.prune_records(&live)?;

        let mut count = 0;
        for address in addresses {
            if let Some((record, tick)) = self.get_with_tick(&address) {
                store.store_record(&address, &record, tick)?;
                count += 1;
            }
        }

        store.flush()?;
        tracing::info!("Saved {} records to disk", count);

        Ok(count)
    }

    fn load_from_disk(&self, store: &PersistentStore) -> anyhow::Result<usize> {
        let records = store.get_all_records()?;
        let count = records.len();

        for (address, record, tick) in records {
            self.insert(address, record, tick);
        }

        tracing::info!("Loaded {} records from disk", count);

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record() -> StoredRecord {
        StoredRecord {
            program: Address::from_label(b"persistence_test"),
            kind: 7,
            data: vec![1, 2, 3, 4],
        }
    }

    #[test]
    fn test_store_and_load_record() {
        let dir = tempdir().unwrap();
        let store = PersistentStore::open(dir.path()).unwrap();

        let address = Address::new_unique();
        store.store_record(&address, &sample_record(), 42).unwrap();
        store.flush().unwrap();

        let all = store.get_all_records().unwrap();
        assert_eq!(all.len(), 1);
        let (loaded_address, loaded, tick) = &all[0];
        assert_eq!(*loaded_address, address);
        assert_eq!(loaded.data, vec![1, 2, 3, 4]);
        assert_eq!(*tick, 42);
    }

    #[test]
    fn test_balances_roundtrip() {
        let dir = tempdir().unwrap();
        let store = PersistentStore::open(dir.path()).unwrap();

        let ledger = TokenLedger::new();
        let holder = Address::new_unique();
        ledger.mint(TokenKind::Gold, holder, 150).unwrap();
        ledger.mint(TokenKind::Rum, holder, 3).unwrap();
        ledger.open_holding(TokenKind::Cannon, holder);

        assert_eq!(store.save_balances(&ledger).unwrap(), 3);

        let restored = TokenLedger::new();
        assert_eq!(store.load_balances(&restored).unwrap(), 3);
        assert_eq!(restored.balance(TokenKind::Gold, &holder), 150);
        assert_eq!(restored.balance(TokenKind::Rum, &holder), 3);
        assert!(restored.holding_exists(TokenKind::Cannon, &holder));
    }

    #[test]
    fn test_metadata() {
        let dir = tempdir().unwrap();
        let store = PersistentStore::open(dir.path()).unwrap();

        let metadata = EngineMetadata {
            tick: 1000,
            record_count: 12,
            last_save_ts: 12345,
        };

        store.save_metadata(&metadata).unwrap();

        let loaded = store.load_metadata().unwrap().unwrap();
        assert_eq!(loaded.tick, 1000);
        assert_eq!(loaded.record_count, 12);
    }

    #[test]
    fn test_record_store_roundtrip() {
        let dir = tempdir().unwrap();
        let persistent = PersistentStore::open(dir.path()).unwrap();

        let store = RecordStore::new();
        let a = Address::new_unique();
        let b = Address::new_unique();
        store.insert(a, sample_record(), 5);
        store.insert(b, sample_record(), 9);

        assert_eq!(store.save_to_disk(&persistent).unwrap(), 2);

        let restored = RecordStore::new();
        assert_eq!(restored.load_from_disk(&persistent).unwrap(), 2);
        assert_eq!(restored.get_with_tick(&a).unwrap().1, 5);
        assert_eq!(restored.get_with_tick(&b).unwrap().1, 9);
    }

    #[test]
    fn test_get_and_remove_record() {
        let dir = tempdir().unwrap();
        let store = PersistentStore::open(dir.path()).unwrap();

        let address = Address::new_unique();
        assert!(store.get_record(&address).unwrap().is_none());

        store.store_record(&address, &sample_record(), 7).unwrap();
        let loaded = store.get_record(&address).unwrap().unwrap();
        assert_eq!(loaded.data, vec![1, 2, 3, 4]);
        assert_eq!(store.record_count(), 1);

        store.remove_record(&address).unwrap();
        assert!(store.get_record(&address).unwrap().is_none());
        assert!(store.get_all_records().unwrap().is_empty());
        assert_eq!(store.record_count(), 0);
    }

    #[test]
    fn test_clear_wipes_all_trees() {
        let dir = tempdir().unwrap();
        let store = PersistentStore::open(dir.path()).unwrap();

        store
            .store_record(&Address::new_unique(), &sample_record(), 1)
            .unwrap();
        let ledger = TokenLedger::new();
        ledger
            .mint(TokenKind::Gold, Address::new_unique(), 10)
            .unwrap();
        store.save_balances(&ledger).unwrap();
        store.save_metadata(&EngineMetadata::default()).unwrap();

        store.clear().unwrap();
        assert_eq!(store.record_count(), 0);
        assert!(store.get_all_records().unwrap().is_empty());
        assert_eq!(store.load_balances(&TokenLedger::new()).unwrap(), 0);
        assert!(store.load_metadata().unwrap().is_none());
    }

    #[test]
    fn test_save_to_disk_prunes_removed_records() {
        let dir = tempdir().unwrap();
        let persistent = PersistentStore::open(dir.path()).unwrap();

        let store = RecordStore::new();
        let kept = Address::new_unique();
        let removed = Address::new_unique();
        store.insert(kept, sample_record(), 1);
        store.insert(removed, sample_record(), 1);
        assert_eq!(store.save_to_disk(&persistent).unwrap(), 2);

        // A record dropped from memory must not come back from disk
        store.remove(&removed);
        assert_eq!(store.save_to_disk(&persistent).unwrap(), 1);

        let restored = RecordStore::new();
        assert_eq!(restored.load_from_disk(&persistent).unwrap(), 1);
        assert!(restored.contains(&kept));
        assert!(!restored.contains(&removed));
    }
}
