use crate::entities::{
    decimal_from_cents, Store, StoreSummary, Transaction, TransactionRecord, TransactionType,
};
use crate::error::ImportOutcome;
use crate::import::{ImportResult, Importer, StoreRepository};
use crate::parser::LineParser;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::io::BufRead;
use std::path::Path;

/// Timestamp layout in the `occurred_at` column (sorts lexically)
const OCCURRED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn open_database(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

/// Create tables and indexes. Safe to run on every startup.
pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Stores Table - natural key (name, owner_name) is unique
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS stores (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            owner_name TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (name, owner_name)
        )",
        [],
    )?;

    // ==========================================================================
    // Transactions Table - value kept in cents, sign already applied
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type INTEGER NOT NULL,
            occurred_at TEXT NOT NULL,
            value_cents INTEGER NOT NULL,
            cpf TEXT NOT NULL,
            card TEXT NOT NULL,
            store_id INTEGER NOT NULL REFERENCES stores(id) ON DELETE CASCADE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute("CREATE INDEX IF NOT EXISTS idx_stores_name ON stores(name)", [])?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_stores_owner_name ON stores(owner_name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_store_id ON transactions(store_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_occurred_at ON transactions(occurred_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_cpf ON transactions(cpf)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// UNIT OF WORK
// ============================================================================

/// One import's writes, held in a single SQLite transaction
///
/// Rows get their ids immediately but only become visible to other
/// connections on `commit`. Dropping the unit of work rolls back.
pub struct SqliteUnitOfWork<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl<'conn> SqliteUnitOfWork<'conn> {
    pub fn begin(conn: &'conn mut Connection) -> Result<Self> {
        let tx = conn
            .transaction()
            .context("Failed to begin import transaction")?;
        Ok(SqliteUnitOfWork { tx })
    }
}

impl StoreRepository for SqliteUnitOfWork<'_> {
    fn find_store(&mut self, name: &str, owner_name: &str) -> Result<Option<Store>> {
        let store = self
            .tx
            .query_row(
                "SELECT id, name, owner_name FROM stores WHERE name = ?1 AND owner_name = ?2",
                params![name, owner_name],
                store_from_row,
            )
            .optional()?;

        Ok(store)
    }

    fn create_store(&mut self, name: &str, owner_name: &str) -> Result<Store> {
        self.tx
            .execute(
                "INSERT INTO stores (name, owner_name) VALUES (?1, ?2)",
                params![name, owner_name],
            )
            .with_context(|| format!("Failed to create store '{}' ({})", name, owner_name))?;

        Ok(Store {
            id: self.tx.last_insert_rowid(),
            name: name.to_string(),
            owner_name: owner_name.to_string(),
        })
    }

    fn add_transaction(&mut self, store: &Store, record: &TransactionRecord) -> Result<()> {
        self.tx.execute(
            "INSERT INTO transactions (type, occurred_at, value_cents, cpf, card, store_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.transaction_type.code(),
                record.occurred_at.format(OCCURRED_AT_FORMAT).to_string(),
                record.value_cents(),
                record.cpf,
                record.card,
                store.id,
            ],
        )?;

        Ok(())
    }

    fn commit(self) -> Result<()> {
        self.tx.commit().context("Failed to commit import")?;
        Ok(())
    }
}

/// Import a CNAB stream into `conn` as one atomic write
pub fn import_cnab<P, R>(
    conn: &mut Connection,
    importer: &Importer<P>,
    reader: R,
) -> ImportOutcome<ImportResult>
where
    P: LineParser,
    R: BufRead,
{
    let unit_of_work = SqliteUnitOfWork::begin(conn)?;
    importer.import(reader, unit_of_work)
}

// ============================================================================
// QUERIES
// ============================================================================

fn store_from_row(row: &Row) -> rusqlite::Result<Store> {
    Ok(Store {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_name: row.get(2)?,
    })
}

fn transaction_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    let code: u8 = row.get(1)?;
    let transaction_type = TransactionType::try_from(code)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Integer, Box::new(e)))?;

    let occurred_at_str: String = row.get(2)?;
    let occurred_at = NaiveDateTime::parse_from_str(&occurred_at_str, OCCURRED_AT_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(Transaction {
        id: row.get(0)?,
        transaction_type,
        occurred_at,
        value: decimal_from_cents(row.get(3)?),
        cpf: row.get(4)?,
        card: row.get(5)?,
        store_id: row.get(6)?,
    })
}

pub fn count_stores(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM stores", [], |row| row.get(0))?;

    Ok(count)
}

/// Number of persisted transactions
pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

    Ok(count)
}

pub fn get_store(conn: &Connection, store_id: i64) -> Result<Option<Store>> {
    let store = conn
        .query_row(
            "SELECT id, name, owner_name FROM stores WHERE id = ?1",
            [store_id],
            store_from_row,
        )
        .optional()?;

    Ok(store)
}

/// Stores with their balance, ordered by name then owner
pub fn get_store_summaries(
    conn: &Connection,
    offset: i64,
    limit: i64,
) -> Result<Vec<StoreSummary>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name, s.owner_name, COALESCE(SUM(t.value_cents), 0) AS balance_cents
         FROM stores s
         LEFT JOIN transactions t ON t.store_id = s.id
         GROUP BY s.id, s.name, s.owner_name
         ORDER BY s.name, s.owner_name
         LIMIT ?1 OFFSET ?2",
    )?;

    let summaries = stmt
        .query_map(params![limit, offset], |row| {
            Ok(StoreSummary {
                store_id: row.get(0)?,
                store_name: row.get(1)?,
                owner_name: row.get(2)?,
                total_balance: decimal_from_cents(row.get(3)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(summaries)
}

/// Every store summary (no paging)
pub fn get_all_store_summaries(conn: &Connection) -> Result<Vec<StoreSummary>> {
    get_store_summaries(conn, 0, -1)
}

/// Transactions of one store in the order they occurred
pub fn get_transactions_by_store(conn: &Connection, store_id: i64) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, type, occurred_at, value_cents, cpf, card, store_id
         FROM transactions
         WHERE store_id = ?1
         ORDER BY occurred_at, id",
    )?;

    let transactions = stmt
        .query_map([store_id], transaction_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}
