//! Vault subsystem configuration.
//!
//! ```json
//! {
//!   "client_id_window": 32,
//!   "initial_shares_per_unit": "0x1",
//!   "authorities": ["0x7a1c0000000000000000000000000000000000ee"]
//! }
//! ```

use crate::domain::{Address, VaultError, VaultResult, DEFAULT_CLIENT_ID_WINDOW};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Number of recent client order ids tracked per vault
    pub client_id_window: usize,
    /// Shares minted per fund unit into an empty vault
    pub initial_shares_per_unit: U256,
    /// Senders allowed to change params and delete vaults
    #[serde(with = "hex_addresses")]
    pub authorities: Vec<Address>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            client_id_window: DEFAULT_CLIENT_ID_WINDOW,
            initial_shares_per_unit: U256::one(),
            authorities: Vec::new(),
        }
    }
}

impl VaultConfig {
    pub fn from_json_str(json: &str) -> VaultResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| VaultError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.client_id_window == 0 {
            return Err(VaultError::InvalidConfig {
                reason: "client_id_window must be non-zero".into(),
            });
        }
        if self.initial_shares_per_unit.is_zero() {
            return Err(VaultError::InvalidConfig {
                reason: "initial_shares_per_unit must be non-zero".into(),
            });
        }
        Ok(())
    }

    pub fn with_authority(mut self, authority: Address) -> Self {
        self.authorities.push(authority);
        self
    }

    pub fn is_authority(&self, sender: &Address) -> bool {
        self.authorities.contains(sender)
    }
}

/// `0x`-prefixed hex strings for address lists.
mod hex_addresses {
    use crate::domain::Address;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        addresses: &[Address],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(addresses.iter().map(|a| format!("0x{}", hex::encode(a))))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Address>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| {
                let bytes = hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)?;
                Address::try_from(bytes.as_slice())
                    .map_err(|_| D::Error::custom(format!("address {s} is not 20 bytes")))
            })
            .collect()
    }
}
