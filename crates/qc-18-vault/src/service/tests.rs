//! # Vault Accounting Service Tests

use super::*;
use crate::adapters::{InMemoryFundsLedger, InMemoryKvStore, ModuleAddressDeriver};
use crate::domain::{StoreError, VaultStatus, MEGAVAULT_ACCOUNT_NAME};
use crate::ports::BatchOperation;
use std::sync::atomic::{AtomicBool, Ordering};

const AUTHORITY: Address = [0xAD; 20];
const ALICE: Address = [0xA1; 20];
const BOB: Address = [0xB0; 20];

type TestService = VaultAccountingService<InMemoryKvStore, InMemoryFundsLedger>;

fn make_test_service() -> (TestService, Arc<InMemoryFundsLedger>) {
    make_test_service_with(VaultConfig::default().with_authority(AUTHORITY))
}

fn make_test_service_with(config: VaultConfig) -> (TestService, Arc<InMemoryFundsLedger>) {
    let funds = Arc::new(InMemoryFundsLedger::default());
    funds.credit(ALICE, U256::from(1_000_000));
    funds.credit(BOB, U256::from(1_000_000));
    let deps = VaultDependencies {
        store: InMemoryKvStore::new(),
        funds: funds.clone(),
        deriver: Arc::new(ModuleAddressDeriver),
    };
    (VaultAccountingService::new(deps, config).unwrap(), funds)
}

fn quoting() -> VaultParams {
    VaultParams::new(VaultStatus::Quoting)
}

fn store_snapshot(service: &TestService) -> std::collections::BTreeMap<Vec<u8>, Vec<u8>> {
    service.store.read().snapshot()
}

#[test]
fn test_create_vault_registers_address_and_params() {
    let (service, _) = make_test_service();
    let vault = VaultId::clob(0);

    let address = service.create_vault(vault, quoting()).unwrap();

    assert_eq!(
        address,
        ModuleAddressDeriver.derive_address(MEGAVAULT_ACCOUNT_NAME, &vault)
    );
    assert_eq!(service.get_vault_address(vault).unwrap(), Some(address));
    assert_eq!(service.get_vault_params(vault).unwrap(), Some(quoting()));
    assert_eq!(
        service.take_events(),
        vec![VaultEvent::VaultCreated {
            vault,
            address,
            params: quoting(),
        }]
    );
}

#[test]
fn test_create_vault_twice_fails() {
    let (service, _) = make_test_service();
    let vault = VaultId::clob(0);
    let address = service.create_vault(vault, quoting()).unwrap();
    service.take_events();

    let err = service
        .create_vault(vault, VaultParams::new(VaultStatus::CloseOnly))
        .unwrap_err();

    assert_eq!(err, VaultError::AlreadyRegistered { vault });
    assert_eq!(service.get_vault_address(vault).unwrap(), Some(address));
    assert_eq!(service.get_vault_params(vault).unwrap(), Some(quoting()));
    assert!(service.take_events().is_empty());
}

#[test]
fn test_create_vault_invalid_params_writes_nothing() {
    let (service, _) = make_test_service();
    let params = quoting().with_quoting_params(QuotingParams {
        layers: 0,
        ..Default::default()
    });

    assert!(matches!(
        service.create_vault(VaultId::clob(0), params),
        Err(VaultError::InvalidParams { field: "layers", .. })
    ));
    assert!(store_snapshot(&service).is_empty());
}

#[test]
fn test_deposit_requires_registered_vault() {
    let (service, funds) = make_test_service();
    let vault = VaultId::clob(9);

    let err = service.deposit(vault, ALICE, U256::from(100)).unwrap_err();

    assert_eq!(err, VaultError::VaultNotFound { vault });
    assert_eq!(funds.balance_of(&ALICE), U256::from(1_000_000));
}

#[test]
fn test_first_deposit_mints_at_initial_rate() {
    let (service, funds) = make_test_service();
    let vault = VaultId::clob(0);
    let address = service.create_vault(vault, quoting()).unwrap();

    let shares = service.deposit(vault, ALICE, U256::from(1_000)).unwrap();

    assert_eq!(shares, U256::from(1_000));
    assert_eq!(service.get_total_shares(vault).unwrap(), U256::from(1_000));
    assert_eq!(service.get_owner_shares(vault, ALICE).unwrap(), U256::from(1_000));
    assert_eq!(funds.balance_of(&address), U256::from(1_000));
    assert_eq!(funds.balance_of(&ALICE), U256::from(999_000));
}

#[test]
fn test_deposit_after_profit_buys_fewer_shares() {
    let (service, funds) = make_test_service();
    let vault = VaultId::clob(0);
    service.create_vault(vault, quoting()).unwrap();
    service.deposit(vault, ALICE, U256::from(1_000)).unwrap();

    // Vault doubled its equity
    funds.set_valuation(vault, U256::from(2_000));
    let shares = service.deposit(vault, BOB, U256::from(1_000)).unwrap();

    assert_eq!(shares, U256::from(500));
    assert_eq!(service.get_total_shares(vault).unwrap(), U256::from(1_500));
    service.check_invariants().unwrap();
}

#[test]
fn test_withdraw_pays_pro_rata() {
    let (service, funds) = make_test_service();
    let vault = VaultId::clob(0);
    service.create_vault(vault, quoting()).unwrap();
    service.deposit(vault, ALICE, U256::from(600)).unwrap();
    service.deposit(vault, BOB, U256::from(400)).unwrap();

    let paid = service.withdraw(vault, BOB, U256::from(400)).unwrap();

    assert_eq!(paid, U256::from(400));
    assert_eq!(funds.balance_of(&BOB), U256::from(1_000_000));
    assert_eq!(service.get_owner_shares(vault, BOB).unwrap(), U256::zero());
    assert_eq!(
        service.get_all_owner_shares(vault).unwrap(),
        vec![OwnerShare {
            owner: ALICE,
            shares: U256::from(600),
        }]
    );
    service.check_invariants().unwrap();
}

#[test]
fn test_withdraw_more_than_owned_changes_nothing() {
    let (service, funds) = make_test_service();
    let vault = VaultId::clob(0);
    let address = service.create_vault(vault, quoting()).unwrap();
    service.deposit(vault, ALICE, U256::from(100)).unwrap();
    service.deposit(vault, BOB, U256::from(100)).unwrap();
    service.take_events();
    let before = store_snapshot(&service);

    let err = service.withdraw(vault, ALICE, U256::from(101)).unwrap_err();

    assert_eq!(
        err,
        VaultError::InsufficientShares {
            required: U256::from(101),
            available: U256::from(100),
        }
    );
    assert_eq!(store_snapshot(&service), before);
    assert_eq!(funds.balance_of(&address), U256::from(200));
    assert!(service.take_events().is_empty());
}

#[test]
fn test_failed_transfer_rolls_back_mint() {
    let (service, funds) = make_test_service();
    let vault = VaultId::clob(0);
    service.create_vault(vault, quoting()).unwrap();
    let before = store_snapshot(&service);

    funds.fail_next_transfer();
    assert!(matches!(
        service.deposit(vault, ALICE, U256::from(100)),
        Err(VaultError::Funds { .. })
    ));

    assert_eq!(store_snapshot(&service), before);
    assert_eq!(service.get_total_shares(vault).unwrap(), U256::zero());
}

#[test]
fn test_failed_payout_rolls_back_burn() {
    let (service, funds) = make_test_service();
    let vault = VaultId::clob(0);
    service.create_vault(vault, quoting()).unwrap();
    service.deposit(vault, ALICE, U256::from(100)).unwrap();
    let before = store_snapshot(&service);

    funds.fail_next_transfer();
    assert!(service.withdraw(vault, ALICE, U256::from(50)).is_err());

    assert_eq!(store_snapshot(&service), before);
    assert_eq!(service.get_owner_shares(vault, ALICE).unwrap(), U256::from(100));
}

#[test]
fn test_deposit_into_worthless_vault_rejected() {
    let (service, funds) = make_test_service();
    let vault = VaultId::clob(0);
    service.create_vault(vault, quoting()).unwrap();
    service.deposit(vault, ALICE, U256::from(100)).unwrap();

    funds.set_valuation(vault, U256::zero());
    assert!(matches!(
        service.deposit(vault, BOB, U256::from(100)),
        Err(VaultError::NonPositiveEquity { .. })
    ));
}

#[test]
fn test_zero_amounts_rejected() {
    let (service, _) = make_test_service();
    let vault = VaultId::clob(0);
    service.create_vault(vault, quoting()).unwrap();

    assert!(matches!(
        service.deposit(vault, ALICE, U256::zero()),
        Err(VaultError::InvalidAmount { .. })
    ));
    assert!(matches!(
        service.withdraw(vault, ALICE, U256::zero()),
        Err(VaultError::InvalidAmount { .. })
    ));
}

#[test]
fn test_initial_share_scaling_from_config() {
    let config = VaultConfig {
        initial_shares_per_unit: U256::from(1_000_000),
        ..VaultConfig::default()
    };
    let (service, _) = make_test_service_with(config);
    let vault = VaultId::clob(0);
    service.create_vault(vault, quoting()).unwrap();

    let shares = service.deposit(vault, ALICE, U256::from(3)).unwrap();
    assert_eq!(shares, U256::from(3_000_000));

    // Redeeming a single share of three million pays nothing but still burns
    let paid = service.withdraw(vault, ALICE, U256::one()).unwrap();
    assert_eq!(paid, U256::zero());
    service.check_invariants().unwrap();
}

#[test]
fn test_quoting_params_fallback_and_override() {
    let (service, _) = make_test_service();
    let vault = VaultId::clob(0);
    service.create_vault(vault, quoting()).unwrap();
    assert_eq!(
        service.get_quoting_params(vault).unwrap(),
        QuotingParams::default()
    );

    let custom = QuotingParams {
        spread_min_ppm: 5_000,
        ..Default::default()
    };
    service
        .update_vault_params(AUTHORITY, vault, quoting().with_quoting_params(custom.clone()))
        .unwrap();
    assert_eq!(service.get_quoting_params(vault).unwrap(), custom);
    assert_eq!(service.get_all_vault_params().unwrap().len(), 1);
}

#[test]
fn test_default_params_require_authority() {
    let (service, _) = make_test_service();
    let params = QuotingParams {
        layers: 4,
        ..Default::default()
    };

    assert_eq!(
        service
            .update_default_quoting_params(ALICE, params.clone())
            .unwrap_err(),
        VaultError::Unauthorized { sender: ALICE }
    );
    assert_eq!(
        service.get_default_quoting_params().unwrap(),
        QuotingParams::default()
    );

    service
        .update_default_quoting_params(AUTHORITY, params.clone())
        .unwrap();
    assert_eq!(service.get_default_quoting_params().unwrap(), params);
    assert_eq!(
        service.get_quoting_params(VaultId::clob(42)).unwrap(),
        params
    );
}

#[test]
fn test_update_params_of_unknown_vault() {
    let (service, _) = make_test_service();
    assert!(matches!(
        service.update_vault_params(AUTHORITY, VaultId::clob(3), quoting()),
        Err(VaultError::VaultNotFound { .. })
    ));
    assert!(service.get_vault_params(VaultId::clob(3)).unwrap().is_none());
}

#[test]
fn test_client_order_window() {
    let config = VaultConfig {
        client_id_window: 3,
        ..VaultConfig::default()
    };
    let (service, _) = make_test_service_with(config);
    let vault = VaultId::clob(0);
    service.create_vault(vault, quoting()).unwrap();

    assert!(service.record_client_order(vault, 1).unwrap());
    assert!(!service.record_client_order(vault, 1).unwrap());
    assert!(service.has_recent_client_id(vault, 1).unwrap());

    for id in 2..=4 {
        service.record_client_order(vault, id).unwrap();
    }
    assert!(!service.has_recent_client_id(vault, 1).unwrap());
    assert_eq!(service.get_recent_client_ids(vault).unwrap(), vec![2, 3, 4]);

    assert!(matches!(
        service.record_client_order(VaultId::clob(1), 1),
        Err(VaultError::VaultNotFound { .. })
    ));
}

#[test]
fn test_delete_vault_requires_empty_vault() {
    let (service, _) = make_test_service();
    let vault = VaultId::clob(0);
    service.create_vault(vault, quoting()).unwrap();
    service.record_client_order(vault, 77).unwrap();
    service.deposit(vault, ALICE, U256::from(10)).unwrap();

    assert!(matches!(
        service.delete_vault(AUTHORITY, vault),
        Err(VaultError::VaultHasShares { .. })
    ));
    assert!(matches!(
        service.delete_vault(BOB, vault),
        Err(VaultError::Unauthorized { .. })
    ));

    service.withdraw(vault, ALICE, U256::from(10)).unwrap();
    service.delete_vault(AUTHORITY, vault).unwrap();

    assert_eq!(service.get_vault_address(vault).unwrap(), None);
    assert_eq!(service.get_vault_params(vault).unwrap(), None);
    assert!(service.get_recent_client_ids(vault).unwrap().is_empty());
    assert!(store_snapshot(&service).is_empty());
}

#[test]
fn test_events_drained_in_order() {
    let (service, _) = make_test_service();
    let vault = VaultId::clob(0);
    service.create_vault(vault, quoting()).unwrap();
    service.deposit(vault, ALICE, U256::from(10)).unwrap();
    service.withdraw(vault, ALICE, U256::from(4)).unwrap();

    let events = service.take_events();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], VaultEvent::VaultCreated { .. }));
    assert!(matches!(
        events[1],
        VaultEvent::Deposited { shares_issued, total_shares, .. }
            if shares_issued == U256::from(10) && total_shares == U256::from(10)
    ));
    assert!(matches!(
        events[2],
        VaultEvent::Withdrawn { funds, total_shares, .. }
            if funds == U256::from(4) && total_shares == U256::from(6)
    ));
    assert!(events.iter().all(|e| e.vault() == Some(vault)));
    assert!(service.take_events().is_empty());
}

#[test]
fn test_invalid_config_rejected() {
    let deps = VaultDependencies {
        store: InMemoryKvStore::new(),
        funds: Arc::new(InMemoryFundsLedger::default()),
        deriver: Arc::new(ModuleAddressDeriver),
    };
    let config = VaultConfig {
        client_id_window: 0,
        ..VaultConfig::default()
    };
    assert!(matches!(
        VaultAccountingService::new(deps, config),
        Err(VaultError::InvalidConfig { .. })
    ));
}

// =============================================================================
// COMMIT FAILURES
// =============================================================================

/// In-memory store whose batch writes can be switched to fail.
struct FlakyStore {
    inner: InMemoryKvStore,
    fail_batches: Arc<AtomicBool>,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.inner.put(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.inner.delete(key)
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                message: "disk full".into(),
            });
        }
        self.inner.atomic_batch_write(operations)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.inner.prefix_scan(prefix)
    }
}

fn make_flaky_service() -> (
    VaultAccountingService<FlakyStore, InMemoryFundsLedger>,
    Arc<InMemoryFundsLedger>,
    Arc<AtomicBool>,
) {
    let funds = Arc::new(InMemoryFundsLedger::default());
    funds.credit(ALICE, U256::from(1_000));
    let fail_batches = Arc::new(AtomicBool::new(false));
    let deps = VaultDependencies {
        store: FlakyStore {
            inner: InMemoryKvStore::new(),
            fail_batches: fail_batches.clone(),
        },
        funds: funds.clone(),
        deriver: Arc::new(ModuleAddressDeriver),
    };
    let service = VaultAccountingService::new(deps, VaultConfig::default()).unwrap();
    (service, funds, fail_batches)
}

#[test]
fn test_deposit_refunded_when_commit_fails() {
    let (service, funds, fail_batches) = make_flaky_service();
    let vault = VaultId::clob(0);
    let address = service.create_vault(vault, quoting()).unwrap();
    service.take_events();

    fail_batches.store(true, Ordering::SeqCst);
    let err = service.deposit(vault, ALICE, U256::from(400)).unwrap_err();

    assert_eq!(
        err,
        VaultError::Store(StoreError::Io {
            message: "disk full".into(),
        })
    );
    assert_eq!(funds.balance_of(&ALICE), U256::from(1_000));
    assert_eq!(funds.balance_of(&address), U256::zero());
    assert_eq!(service.get_owner_shares(vault, ALICE).unwrap(), U256::zero());
    assert!(service.take_events().is_empty());
}

#[test]
fn test_withdraw_clawed_back_when_commit_fails() {
    let (service, funds, fail_batches) = make_flaky_service();
    let vault = VaultId::clob(0);
    let address = service.create_vault(vault, quoting()).unwrap();
    service.deposit(vault, ALICE, U256::from(400)).unwrap();
    service.take_events();

    fail_batches.store(true, Ordering::SeqCst);
    assert!(matches!(
        service.withdraw(vault, ALICE, U256::from(100)),
        Err(VaultError::Store(_))
    ));

    assert_eq!(funds.balance_of(&ALICE), U256::from(600));
    assert_eq!(funds.balance_of(&address), U256::from(400));
    assert_eq!(service.get_owner_shares(vault, ALICE).unwrap(), U256::from(400));
    assert!(service.take_events().is_empty());

    fail_batches.store(false, Ordering::SeqCst);
    assert_eq!(
        service.withdraw(vault, ALICE, U256::from(100)).unwrap(),
        U256::from(100)
    );
    service.check_invariants().unwrap();
}
