use crate::domain::{Address, VaultId};
use crate::ports::AddressDeriver;
use sha2::{Digest, Sha256};

/// Type tag hashed into every module-derived address.
const MODULE_TYPE: &[u8] = b"module";

/// Module account address derivation.
///
/// `sha256(sha256("module") ++ name ++ 0x00 ++ vault_key)[..20]`. The zero
/// byte separates the name from the key so `("ab", "c")` and `("a", "bc")`
/// cannot collide.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModuleAddressDeriver;

impl AddressDeriver for ModuleAddressDeriver {
    fn derive_address(&self, module_account_name: &str, vault: &VaultId) -> Address {
        let type_hash = Sha256::digest(MODULE_TYPE);

        let mut hasher = Sha256::new();
        hasher.update(type_hash);
        hasher.update(module_account_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(vault.to_key_bytes());
        let digest = hasher.finalize();

        let mut address = [0u8; 20];
        address.copy_from_slice(&digest[..20]);
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MEGAVAULT_ACCOUNT_NAME;

    #[test]
    fn test_derivation_is_deterministic() {
        let deriver = ModuleAddressDeriver;
        let vault = VaultId::clob(7);
        assert_eq!(
            deriver.derive_address(MEGAVAULT_ACCOUNT_NAME, &vault),
            deriver.derive_address(MEGAVAULT_ACCOUNT_NAME, &vault)
        );
    }

    #[test]
    fn test_inputs_change_address() {
        let deriver = ModuleAddressDeriver;
        let base = deriver.derive_address(MEGAVAULT_ACCOUNT_NAME, &VaultId::clob(0));
        assert_ne!(base, deriver.derive_address(MEGAVAULT_ACCOUNT_NAME, &VaultId::clob(1)));
        assert_ne!(base, deriver.derive_address("vault", &VaultId::clob(0)));
        assert_ne!(base, [0u8; 20]);
    }
}
