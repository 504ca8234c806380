// ⚠️ Error types
//
// Two classes of failure:
// - ValidationError: one bad CNAB line. Recorded in the import result,
//   never aborts the batch.
// - ImportError: the stream or the storage failed. Fatal for the whole
//   import, nothing is persisted.

use thiserror::Error;

/// Per-line validation failure
///
/// The Display text is what callers see in `failed[].error`, so each
/// variant names the offending field and echoes the raw slice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("CNAB line cannot be null or whitespace.")]
    BlankLine,

    #[error("Line too short: expected at least {expected} characters, got {actual}.")]
    LineTooShort { expected: usize, actual: usize },

    #[error("Invalid transaction type format: '{0}'.")]
    InvalidTypeFormat(String),

    #[error("Invalid transaction type value: '{0}'.")]
    InvalidTypeValue(String),

    #[error("Unknown transaction type: {0}")]
    UnknownTransactionType(u8),

    #[error("Invalid date format (non-digit characters): '{0}'.")]
    InvalidDateFormat(String),

    #[error("Invalid date value: '{0}'.")]
    InvalidDateValue(String),

    #[error("Invalid time format (non-digit characters): '{0}'.")]
    InvalidTimeFormat(String),

    #[error("Invalid time value: '{0}'.")]
    InvalidTimeValue(String),

    #[error("Invalid transaction value format: '{0}'.")]
    InvalidValueFormat(String),

    #[error("Invalid CPF format: '{0}'. Expected 11 digits.")]
    InvalidCpf(String),

    #[error("Card field cannot be empty.")]
    EmptyCard,

    #[error("Store owner cannot be empty.")]
    EmptyStoreOwner,

    #[error("Store name cannot be empty.")]
    EmptyStoreName,
}

impl ValidationError {
    /// Name of the CNAB field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::BlankLine | ValidationError::LineTooShort { .. } => "line",
            ValidationError::InvalidTypeFormat(_)
            | ValidationError::InvalidTypeValue(_)
            | ValidationError::UnknownTransactionType(_) => "type",
            ValidationError::InvalidDateFormat(_) | ValidationError::InvalidDateValue(_) => "date",
            ValidationError::InvalidTimeFormat(_) | ValidationError::InvalidTimeValue(_) => "time",
            ValidationError::InvalidValueFormat(_) => "value",
            ValidationError::InvalidCpf(_) => "cpf",
            ValidationError::EmptyCard => "card",
            ValidationError::EmptyStoreOwner => "storeOwner",
            ValidationError::EmptyStoreName => "storeName",
        }
    }
}

/// Infrastructure failure that aborts a whole import
#[derive(Debug, Error)]
pub enum ImportError {
    /// Reading the input stream failed
    #[error("I/O error while reading CNAB stream: {0}")]
    Io(#[from] std::io::Error),

    /// The storage collaborator failed (lookup, insert, or commit)
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),

    /// The caller raised the cancellation flag
    #[error("Import cancelled before line {line_number}")]
    Cancelled { line_number: usize },
}

pub type ImportOutcome<T> = Result<T, ImportError>;
