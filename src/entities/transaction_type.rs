// 🏷️ Transaction Type - CNAB type codes and their fixed metadata
//
// Every CNAB line starts with a single digit that says what kind of
// movement it is. The digit decides the sign of the amount:
// income types add to the store balance, expense types subtract.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

// ============================================================================
// NATURE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nature {
    /// Money coming into the store
    Income,

    /// Money leaving the store
    Expense,
}

impl Nature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Nature::Income => "Income",
            Nature::Expense => "Expense",
        }
    }

    /// Polarity applied to the unsigned amount read from the line
    pub fn sign(&self) -> i32 {
        match self {
            Nature::Income => 1,
            Nature::Expense => -1,
        }
    }
}

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

/// CNAB transaction type, one variant per known code (1-9)
///
/// Serialized as its numeric code so API consumers see `"type": 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TransactionType {
    Debit,
    Boleto,
    Financing,
    Credit,
    LoanReceipt,
    Sales,
    TedReceipt,
    DocReceipt,
    Rent,
}

/// Immutable per-type metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMetadata {
    pub transaction_type: TransactionType,
    pub description: &'static str,
    pub nature: Nature,
}

impl TypeMetadata {
    pub fn sign(&self) -> i32 {
        self.nature.sign()
    }
}

impl TransactionType {
    /// All known types, in code order
    pub const ALL: [TransactionType; 9] = [
        TransactionType::Debit,
        TransactionType::Boleto,
        TransactionType::Financing,
        TransactionType::Credit,
        TransactionType::LoanReceipt,
        TransactionType::Sales,
        TransactionType::TedReceipt,
        TransactionType::DocReceipt,
        TransactionType::Rent,
    ];

    /// Map a CNAB digit to its type. Unknown codes return None.
    pub fn from_code(code: u8) -> Option<TransactionType> {
        match code {
            1 => Some(TransactionType::Debit),
            2 => Some(TransactionType::Boleto),
            3 => Some(TransactionType::Financing),
            4 => Some(TransactionType::Credit),
            5 => Some(TransactionType::LoanReceipt),
            6 => Some(TransactionType::Sales),
            7 => Some(TransactionType::TedReceipt),
            8 => Some(TransactionType::DocReceipt),
            9 => Some(TransactionType::Rent),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            TransactionType::Debit => 1,
            TransactionType::Boleto => 2,
            TransactionType::Financing => 3,
            TransactionType::Credit => 4,
            TransactionType::LoanReceipt => 5,
            TransactionType::Sales => 6,
            TransactionType::TedReceipt => 7,
            TransactionType::DocReceipt => 8,
            TransactionType::Rent => 9,
        }
    }

    pub fn metadata(&self) -> TypeMetadata {
        let (description, nature) = match self {
            TransactionType::Debit => ("Debit", Nature::Income),
            TransactionType::Boleto => ("Boleto", Nature::Expense),
            TransactionType::Financing => ("Financing", Nature::Expense),
            TransactionType::Credit => ("Credit", Nature::Income),
            TransactionType::LoanReceipt => ("Loan Receipt", Nature::Income),
            TransactionType::Sales => ("Sales", Nature::Income),
            TransactionType::TedReceipt => ("TED Receipt", Nature::Income),
            TransactionType::DocReceipt => ("DOC Receipt", Nature::Income),
            TransactionType::Rent => ("Rent", Nature::Expense),
        };

        TypeMetadata {
            transaction_type: *self,
            description,
            nature,
        }
    }

    pub fn description(&self) -> &'static str {
        self.metadata().description
    }

    pub fn nature(&self) -> Nature {
        self.metadata().nature
    }

    pub fn sign(&self) -> i32 {
        self.metadata().sign()
    }
}

impl From<TransactionType> for u8 {
    fn from(tx_type: TransactionType) -> u8 {
        tx_type.code()
    }
}

impl TryFrom<u8> for TransactionType {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        TransactionType::from_code(code).ok_or(ValidationError::UnknownTransactionType(code))
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

// ============================================================================
// TESTS
// ============================================================================
