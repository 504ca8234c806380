// 💸 Transaction - parsed CNAB record and its persisted form
//
// TransactionRecord is the value the parser hands to the importer.
// Transaction is the row that lives in the database, linked to a store.

use super::transaction_type::TransactionType;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One validated CNAB line
///
/// `value` already carries the sign of its transaction type
/// (positive = income, negative = expense), scale 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub occurred_at: NaiveDateTime,
    pub value: Decimal,
    pub cpf: String,
    pub card: String,
    pub store_owner: String,
    pub store_name: String,
}

impl TransactionRecord {
    /// Value in cents, the unit used for storage
    pub fn value_cents(&self) -> i64 {
        let mut value = self.value;
        value.rescale(2);
        value.mantissa() as i64
    }
}

/// Persisted transaction, immutable once written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub occurred_at: NaiveDateTime,
    pub value: Decimal,
    pub cpf: String,
    pub card: String,
    pub store_id: i64,
}

/// Convert stored cents back into a two-decimal amount
pub fn decimal_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
