//! # Client Order Id Tracker
//!
//! Keeps the most recent `capacity` client order ids of each vault so that
//! a resubmitted order within that horizon can be spotted.
//!
//! This is best-effort duplicate suppression only. An id evicted from the
//! window is indistinguishable from one never seen.

use super::codec::{decode_record, encode_record};
use super::entities::{ClientId, VaultId};
use super::errors::{VaultError, VaultResult};
use super::keys::KeySpace;
use crate::ports::KeyValueStore;
use tracing::debug;

/// Default window size.
pub const DEFAULT_CLIENT_ID_WINDOW: usize = 32;

#[derive(Clone, Debug)]
pub struct OrderIdTracker {
    keys: KeySpace,
    capacity: usize,
}

impl Default for OrderIdTracker {
    fn default() -> Self {
        Self {
            keys: KeySpace::default(),
            capacity: DEFAULT_CLIENT_ID_WINDOW,
        }
    }
}

impl OrderIdTracker {
    pub fn new(keys: KeySpace, capacity: usize) -> VaultResult<Self> {
        if capacity == 0 {
            return Err(VaultError::InvalidConfig {
                reason: "client id window must be non-zero".into(),
            });
        }
        Ok(Self { keys, capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tracked ids of `vault`, oldest first.
    pub fn get_recent_client_ids<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        vault: &VaultId,
    ) -> VaultResult<Vec<ClientId>> {
        match store.get(&self.keys.most_recent_client_ids_key(vault))? {
            Some(bytes) => decode_record(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Append `client_id` to the window of `vault`, evicting the oldest ids
    /// past capacity. Returns `false` without writing if it is already
    /// tracked.
    pub fn record_client_id<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        vault: &VaultId,
        client_id: ClientId,
    ) -> VaultResult<bool> {
        let mut ids = self.get_recent_client_ids(&*store, vault)?;
        if ids.contains(&client_id) {
            return Ok(false);
        }

        ids.push(client_id);
        // A shrunken capacity trims several at once.
        if ids.len() > self.capacity {
            let excess = ids.len() - self.capacity;
            ids.drain(..excess);
        }

        store.put(
            &self.keys.most_recent_client_ids_key(vault),
            &encode_record(&ids)?,
        )?;
        debug!("[qc-18] Vault {} tracking client id {}", vault, client_id);
        Ok(true)
    }

    /// Whether `client_id` is inside the current window of `vault`.
    pub fn has_recent_client_id<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        vault: &VaultId,
        client_id: ClientId,
    ) -> VaultResult<bool> {
        Ok(self.get_recent_client_ids(store, vault)?.contains(&client_id))
    }

    /// Overwrite the window of `vault`, keeping the newest `capacity` ids.
    pub fn set_recent_client_ids<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        vault: &VaultId,
        ids: &[ClientId],
    ) -> VaultResult<()> {
        let key = self.keys.most_recent_client_ids_key(vault);
        if ids.is_empty() {
            store.delete(&key)?;
            return Ok(());
        }
        let start = ids.len().saturating_sub(self.capacity);
        store.put(&key, &encode_record(&ids[start..].to_vec())?)?;
        Ok(())
    }

    pub fn clear<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        vault: &VaultId,
    ) -> VaultResult<()> {
        store.delete(&self.keys.most_recent_client_ids_key(vault))?;
        Ok(())
    }
}
