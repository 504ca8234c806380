// Entity Models
//
// - TransactionType: closed set of CNAB type codes with fixed metadata
// - TransactionRecord / Transaction: parsed line and persisted row
// - Store: merchant keyed by (name, owner_name), balance always derived

pub mod store;
pub mod transaction;
pub mod transaction_type;

pub use store::{Store, StoreSummary};
pub use transaction::{decimal_from_cents, Transaction, TransactionRecord};
pub use transaction_type::{Nature, TransactionType, TypeMetadata};
