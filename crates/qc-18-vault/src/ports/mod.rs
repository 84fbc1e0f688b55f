//! Ports layer (Hexagonal Architecture)

pub mod inbound;
pub mod outbound;

pub use inbound::VaultAccountingApi;
pub use outbound::{AddressDeriver, BatchOperation, FundsGateway, KeyValueStore};
