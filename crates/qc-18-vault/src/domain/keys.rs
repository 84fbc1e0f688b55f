//! # Vault Key Space
//!
//! Every persisted row lives under one of six key families. Family literals
//! are chosen so that no literal is a prefix of another, which makes a scan
//! over one family prefix return rows of that family only. A colliding
//! literal fails const evaluation and the crate does not compile.
//!
//! ## Layout
//!
//! ```text
//! <namespace>/TotalShares          ++ vault(5)              -> U256
//! <namespace>/OwnerShares:         ++ vault(5) ++ owner(20) -> U256
//! <namespace>/DefaultQuotingParams                          -> QuotingParams
//! <namespace>/VaultParams:         ++ vault(5)              -> VaultParams
//! <namespace>/VaultAddress:        ++ vault(5)              -> Address
//! <namespace>/MostRecentClientIds: ++ vault(5)              -> Vec<ClientId>
//! ```

use super::entities::{Address, VaultId};

/// Module name.
pub const MODULE_NAME: &str = "vault";

/// Store key (namespace of the module's sub-store).
pub const STORE_KEY: &str = MODULE_NAME;

/// Total shares of a vault.
pub const TOTAL_SHARES_KEY: &str = "TotalShares";

/// Per-owner shares of a vault.
pub const OWNER_SHARES_KEY_PREFIX: &str = "OwnerShares:";

/// Default quoting params singleton.
pub const DEFAULT_QUOTING_PARAMS_KEY: &str = "DefaultQuotingParams";

/// Per-vault params.
pub const VAULT_PARAMS_KEY_PREFIX: &str = "VaultParams:";

/// Vault id to account address mapping.
pub const VAULT_ADDRESS_KEY_PREFIX: &str = "VaultAddress:";

/// Most recent client ids of a vault.
pub const MOST_RECENT_CLIENT_IDS_KEY_PREFIX: &str = "MostRecentClientIds:";

/// Module account that vault addresses are derived from.
pub const MEGAVAULT_ACCOUNT_NAME: &str = "megavault";

/// Separator between the namespace and the family literal.
const NAMESPACE_SEPARATOR: u8 = b'/';

/// Persisted entity families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    TotalShares,
    OwnerShares,
    DefaultQuotingParams,
    VaultParams,
    VaultAddress,
    MostRecentClientIds,
}

impl KeyFamily {
    pub const ALL: [KeyFamily; 6] = [
        KeyFamily::TotalShares,
        KeyFamily::OwnerShares,
        KeyFamily::DefaultQuotingParams,
        KeyFamily::VaultParams,
        KeyFamily::VaultAddress,
        KeyFamily::MostRecentClientIds,
    ];

    pub const fn literal(self) -> &'static str {
        match self {
            KeyFamily::TotalShares => TOTAL_SHARES_KEY,
            KeyFamily::OwnerShares => OWNER_SHARES_KEY_PREFIX,
            KeyFamily::DefaultQuotingParams => DEFAULT_QUOTING_PARAMS_KEY,
            KeyFamily::VaultParams => VAULT_PARAMS_KEY_PREFIX,
            KeyFamily::VaultAddress => VAULT_ADDRESS_KEY_PREFIX,
            KeyFamily::MostRecentClientIds => MOST_RECENT_CLIENT_IDS_KEY_PREFIX,
        }
    }
}

const fn is_prefix(a: &[u8], b: &[u8]) -> bool {
    if a.len() > b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn families_disjoint(families: &[KeyFamily]) -> bool {
    let mut i = 0;
    while i < families.len() {
        let mut j = 0;
        while j < families.len() {
            let a = families[i].literal().as_bytes();
            let b = families[j].literal().as_bytes();
            if i != j && is_prefix(a, b) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(
    families_disjoint(&KeyFamily::ALL),
    "vault key family literals must be prefix-free"
);

/// Key builder for the vault store.
///
/// Injected into every store so tests can run several key spaces side by
/// side in one backing store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySpace {
    namespace: Vec<u8>,
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(STORE_KEY)
    }
}

impl KeySpace {
    pub fn new(namespace: &str) -> Self {
        let mut bytes = Vec::with_capacity(namespace.len() + 1);
        bytes.extend_from_slice(namespace.as_bytes());
        bytes.push(NAMESPACE_SEPARATOR);
        Self { namespace: bytes }
    }

    /// Scan prefix covering every row of `family`.
    pub fn prefix_for(&self, family: KeyFamily) -> Vec<u8> {
        let literal = family.literal().as_bytes();
        let mut key = Vec::with_capacity(self.namespace.len() + literal.len());
        key.extend_from_slice(&self.namespace);
        key.extend_from_slice(literal);
        key
    }

    /// Key of one `family` row identified by `id`.
    pub fn key_for(&self, family: KeyFamily, id: &[u8]) -> Vec<u8> {
        let mut key = self.prefix_for(family);
        key.extend_from_slice(id);
        key
    }

    /// Identifier part of a key scanned under `family`.
    pub fn strip_prefix<'k>(&self, family: KeyFamily, key: &'k [u8]) -> Option<&'k [u8]> {
        key.strip_prefix(self.namespace.as_slice())?
            .strip_prefix(family.literal().as_bytes())
    }

    pub fn total_shares_key(&self, vault: &VaultId) -> Vec<u8> {
        self.key_for(KeyFamily::TotalShares, &vault.to_key_bytes())
    }

    pub fn owner_shares_prefix(&self, vault: &VaultId) -> Vec<u8> {
        self.key_for(KeyFamily::OwnerShares, &vault.to_key_bytes())
    }

    pub fn owner_shares_key(&self, vault: &VaultId, owner: &Address) -> Vec<u8> {
        let mut key = self.owner_shares_prefix(vault);
        key.extend_from_slice(owner);
        key
    }

    pub fn default_quoting_params_key(&self) -> Vec<u8> {
        self.prefix_for(KeyFamily::DefaultQuotingParams)
    }

    pub fn vault_params_key(&self, vault: &VaultId) -> Vec<u8> {
        self.key_for(KeyFamily::VaultParams, &vault.to_key_bytes())
    }

    pub fn vault_address_key(&self, vault: &VaultId) -> Vec<u8> {
        self.key_for(KeyFamily::VaultAddress, &vault.to_key_bytes())
    }

    pub fn most_recent_client_ids_key(&self, vault: &VaultId) -> Vec<u8> {
        self.key_for(KeyFamily::MostRecentClientIds, &vault.to_key_bytes())
    }
}
