//! Value encoding for persisted rows.
//!
//! Share amounts are stored as fixed 32-byte big-endian integers, addresses
//! as their raw 20 bytes, and structured records with bincode.

use super::entities::Address;
use super::errors::{VaultError, VaultResult};
use primitive_types::U256;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode_u256(value: &U256) -> Vec<u8> {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out.to_vec()
}

pub fn decode_u256(bytes: &[u8]) -> VaultResult<U256> {
    if bytes.len() != 32 {
        return Err(VaultError::Codec {
            reason: format!("U256 must be 32 bytes, got {}", bytes.len()),
        });
    }
    Ok(U256::from_big_endian(bytes))
}

pub fn decode_address(bytes: &[u8]) -> VaultResult<Address> {
    bytes.try_into().map_err(|_| VaultError::Codec {
        reason: format!("address must be 20 bytes, got {}", bytes.len()),
    })
}

pub fn encode_record<T: Serialize>(value: &T) -> VaultResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| VaultError::Codec {
        reason: format!("encode failed: {}", e),
    })
}

pub fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> VaultResult<T> {
    bincode::deserialize(bytes).map_err(|e| VaultError::Codec {
        reason: format!("decode failed: {}", e),
    })
}
