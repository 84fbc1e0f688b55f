//! # In-Memory Store
//!
//! `BTreeMap`-backed `KeyValueStore`. Key order matches byte order, so prefix
//! scans are a range walk.

use crate::domain::StoreError;
use crate::ports::{BatchOperation, KeyValueStore};
use std::collections::BTreeMap;

/// In-memory ordered key-value store for tests and single-node setups.
#[derive(Clone, Debug, Default)]
pub struct InMemoryKvStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of every entry, for before/after comparisons.
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.entries.clone()
    }
}

impl KeyValueStore for InMemoryKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.entries.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_operations() {
        let mut store = InMemoryKvStore::new();
        let key = b"vault/TotalShares";

        // Put
        store.put(key, &[1, 2, 3]).unwrap();

        // Get
        assert_eq!(store.get(key).unwrap(), Some(vec![1, 2, 3]));
        assert!(store.exists(key).unwrap());

        // Delete
        store.delete(key).unwrap();
        assert_eq!(store.get(key).unwrap(), None);
        store.delete(key).unwrap();
    }

    #[test]
    fn test_prefix_scan_is_ordered_and_bounded() {
        let mut store = InMemoryKvStore::new();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"a:2".to_vec(), vec![2]),
                BatchOperation::put(b"a:1".to_vec(), vec![1]),
                BatchOperation::put(b"b:1".to_vec(), vec![3]),
                BatchOperation::put(b"a".to_vec(), vec![0]),
            ])
            .unwrap();

        let scanned = store.prefix_scan(b"a:").unwrap();
        assert_eq!(
            scanned,
            vec![(b"a:1".to_vec(), vec![1]), (b"a:2".to_vec(), vec![2])]
        );
    }
}
