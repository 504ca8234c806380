// CNAB Store - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod import;
pub mod parser;
pub mod summary;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Config;
pub use db::{
    count_stores, get_all_store_summaries, get_store, get_store_summaries,
    get_transactions_by_store, import_cnab, open_database, setup_database, verify_count,
    SqliteUnitOfWork,
};
pub use entities::{
    Nature, Store, StoreSummary, Transaction, TransactionRecord, TransactionType, TypeMetadata,
};
pub use error::{ImportError, ValidationError};
pub use import::{FailedLine, ImportResult, ImportedLine, Importer, StoreRepository};
pub use parser::{CnabLineParser, LineParser};
pub use summary::{export_store_summaries, summarize_stores, PageRequest, StoreSummaryPage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the tracing subscriber used by both binaries (RUST_LOG, default info)
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
