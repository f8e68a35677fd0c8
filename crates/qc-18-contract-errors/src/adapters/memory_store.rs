//! # In-Memory Key-Value Store
//!
//! Ordered in-memory `KeyValueStore` for tests and single-node development.
//! Production uses a RocksDB column family with true atomic transactions.

use crate::errors::StoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use std::collections::BTreeMap;

/// In-memory key-value store.
///
/// Keys are kept in a `BTreeMap` so prefix scans come back ordered.
/// `fail_writes` makes every mutation fail, for exercising fatal paths.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    fail_writes: bool,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make all subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Io {
                message: "write rejected by store".to_string(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.data.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        // Checked up front, so a rejected batch applies nothing
        self.check_writable()?;
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError> {
        let results: ScanResult = self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_kv_store() {
        let mut store = InMemoryKVStore::new();

        store.put(b"key1", b"value1").unwrap();
        store.put(b"key2", b"value2").unwrap();

        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get(b"key3").unwrap(), None);
        assert!(store.exists(b"key1").unwrap());

        store.delete(b"key1").unwrap();
        assert!(!store.exists(b"key1").unwrap());
    }

    #[test]
    fn test_prefix_scan_is_ordered() {
        let mut store = InMemoryKVStore::new();

        store.put(&[5, 0, 2], b"b").unwrap();
        store.put(&[5, 0, 1], b"a").unwrap();
        store.put(&[6, 0, 0], b"other").unwrap();
        store.put(&[4, 9, 9], b"before").unwrap();

        let scanned = store.prefix_scan(&[5]).unwrap();
        assert_eq!(
            scanned,
            vec![
                (vec![5, 0, 1], b"a".to_vec()),
                (vec![5, 0, 2], b"b".to_vec()),
            ]
        );
    }

    #[test]
    fn test_failed_batch_applies_nothing() {
        let mut store = InMemoryKVStore::new();
        store.set_fail_writes(true);

        let ops = vec![BatchOperation::put(b"a".to_vec(), b"1".to_vec())];
        assert!(store.atomic_batch_write(ops).is_err());
        assert!(store.is_empty());

        store.set_fail_writes(false);
        let ops = vec![
            BatchOperation::put(b"a".to_vec(), b"1".to_vec()),
            BatchOperation::put(b"b".to_vec(), b"2".to_vec()),
            BatchOperation::delete(b"a".to_vec()),
        ];
        store.atomic_batch_write(ops).unwrap();
        assert_eq!(store.len(), 1);
    }
}
