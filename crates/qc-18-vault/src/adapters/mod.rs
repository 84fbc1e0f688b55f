//! Adapters layer (Hexagonal Architecture)
//!
//! - `memory_store`: ordered in-memory `KeyValueStore`
//! - `branch`: transaction overlay used by every state transition
//! - `address`: module account address derivation
//! - `funds`: in-memory bank for tests and local runs
//! - `rocksdb_store`: durable store (feature `rocksdb`)

pub mod address;
pub mod branch;
pub mod funds;
pub mod memory_store;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;

pub use address::ModuleAddressDeriver;
pub use branch::StoreBranch;
pub use funds::InMemoryFundsLedger;
pub use memory_store::InMemoryKvStore;
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::{RocksDbConfig, RocksDbKvStore};
