// 🏪 Store - merchant identified by (name, owner_name)
//
// The pair is the natural key: the importer looks stores up by it and the
// database enforces it with a unique index. Balance is never stored, it is
// always the sum of the store's transaction values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: i64,
    pub name: String,
    pub owner_name: String,
}

impl Store {
    /// True when this store is the one identified by (name, owner_name)
    pub fn is_keyed_by(&self, name: &str, owner_name: &str) -> bool {
        self.name == name && self.owner_name == owner_name
    }
}

/// Store with its derived balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    pub store_id: i64,
    pub store_name: String,
    pub owner_name: String,
    pub total_balance: Decimal,
}
