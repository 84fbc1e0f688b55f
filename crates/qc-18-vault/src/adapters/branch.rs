//! # Store Branch
//!
//! Write-buffering overlay over a parent `KeyValueStore`. Reads see the
//! branch's own pending writes first; nothing reaches the parent until
//! `commit`, which flushes everything as one atomic batch. Dropping a branch
//! without committing discards its writes.
//!
//! Every vault state transition runs inside a branch, so a failure at any
//! step leaves the parent store untouched.

use crate::domain::StoreError;
use crate::ports::{BatchOperation, KeyValueStore};
use std::collections::BTreeMap;

pub struct StoreBranch<'a, S: KeyValueStore + ?Sized> {
    parent: &'a mut S,
    /// `None` marks a pending delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, S: KeyValueStore + ?Sized> StoreBranch<'a, S> {
    pub fn new(parent: &'a mut S) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Pending writes in key order.
    pub fn pending(&self) -> Vec<BatchOperation> {
        self.writes
            .iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOperation::put(key.clone(), value.clone()),
                None => BatchOperation::delete(key.clone()),
            })
            .collect()
    }

    /// Flush pending writes to the parent atomically. Returns the number of
    /// operations written.
    pub fn commit(self) -> Result<usize, StoreError> {
        if self.writes.is_empty() {
            return Ok(0);
        }
        let operations = self.pending();
        let count = operations.len();
        self.parent.atomic_batch_write(operations)?;
        Ok(count)
    }
}

impl<'a, S: KeyValueStore + ?Sized> KeyValueStore for StoreBranch<'a, S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.parent.get(key),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.writes.insert(key, Some(value));
                }
                BatchOperation::Delete { key } => {
                    self.writes.insert(key, None);
                }
            }
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.prefix_scan(prefix)?.into_iter().collect();

        for (key, pending) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            match pending {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}
