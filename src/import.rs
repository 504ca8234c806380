// 📥 CNAB Import
// Byte stream → parsed lines → stores + transactions → one commit
//
// Single linear pass in file order. Bad lines are recorded and skipped,
// storage or stream failures abort the whole import.

use crate::entities::{Store, TransactionRecord};
use crate::error::{ImportError, ImportOutcome};
use crate::parser::{CnabLineParser, LineParser};
use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// STORAGE SEAM
// ============================================================================

/// Unit of work the importer writes through
///
/// Nothing written through it is durable until `commit` succeeds.
/// Dropping it without committing must discard every staged write.
pub trait StoreRepository {
    /// Look up a persisted store by its natural key
    fn find_store(&mut self, name: &str, owner_name: &str) -> Result<Option<Store>>;

    /// Create a store; the repository assigns the id
    fn create_store(&mut self, name: &str, owner_name: &str) -> Result<Store>;

    /// Stage a transaction for `store`
    fn add_transaction(&mut self, store: &Store, record: &TransactionRecord) -> Result<()>;

    /// Make every staged write durable in one step
    fn commit(self) -> Result<()>
    where
        Self: Sized;
}

// ============================================================================
// IMPORT RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedLine {
    pub line_number: usize,
    pub transaction: TransactionRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedLine {
    pub line_number: usize,
    pub error: String,
    pub raw_line: String,
}

/// Outcome of one import call. Blank lines are not counted anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub total_lines: usize,
    pub imported_count: usize,
    pub failed_count: usize,
    pub imported: Vec<ImportedLine>,
    pub failed: Vec<FailedLine>,
}

impl ImportResult {
    fn from_lines(imported: Vec<ImportedLine>, failed: Vec<FailedLine>) -> Self {
        ImportResult {
            total_lines: imported.len() + failed.len(),
            imported_count: imported.len(),
            failed_count: failed.len(),
            imported,
            failed,
        }
    }
}

// ============================================================================
// IMPORTER
// ============================================================================

pub struct Importer<P = CnabLineParser> {
    parser: P,
    cancel: Option<Arc<AtomicBool>>,
}

impl Importer<CnabLineParser> {
    pub fn new() -> Self {
        Importer::with_parser(CnabLineParser::new())
    }
}

impl Default for Importer<CnabLineParser> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: LineParser> Importer<P> {
    pub fn with_parser(parser: P) -> Self {
        Importer {
            parser,
            cancel: None,
        }
    }

    /// Abort when `flag` is raised. Checked before each line is parsed
    /// and before the final commit.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Import every line of `reader` through `repo`
    ///
    /// Returns the per-line accounting only after `repo.commit()` succeeded.
    /// Any `Err` means nothing from this call was persisted.
    pub fn import<R, S>(&self, mut reader: R, mut repo: S) -> ImportOutcome<ImportResult>
    where
        R: BufRead,
        S: StoreRepository,
    {
        let mut imported = Vec::new();
        let mut failed = Vec::new();
        let mut staged = StagedStores::default();

        let mut buf = Vec::new();
        let mut line_number = 0;

        loop {
            buf.clear();
            if read_raw_line(&mut reader, &mut buf)? == 0 {
                break;
            }
            line_number += 1;

            let line = decode_line(&buf, line_number == 1);
            if line.trim().is_empty() {
                continue;
            }

            self.check_cancelled(line_number)?;

            match self.parser.parse_line(&line) {
                Ok(record) => {
                    let store = staged.resolve(&mut repo, &record.store_name, &record.store_owner)?;
                    repo.add_transaction(&store, &record)?;

                    imported.push(ImportedLine {
                        line_number,
                        transaction: record,
                    });
                }
                Err(e) => {
                    warn!(line_number, field = e.field(), error = %e, "Skipping invalid CNAB line");

                    failed.push(FailedLine {
                        line_number,
                        error: e.to_string(),
                        raw_line: line,
                    });
                }
            }
        }

        self.check_cancelled(line_number + 1)?;
        repo.commit()?;

        let result = ImportResult::from_lines(imported, failed);

        info!(
            total_lines = result.total_lines,
            imported = result.imported_count,
            failed = result.failed_count,
            stores_created = staged.created,
            parser_version = self.parser.version(),
            "CNAB import committed"
        );

        Ok(result)
    }

    fn check_cancelled(&self, line_number: usize) -> ImportOutcome<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => {
                warn!(line_number, "CNAB import cancelled, nothing committed");
                Err(ImportError::Cancelled { line_number })
            }
            _ => Ok(()),
        }
    }
}

/// Read one line into `buf` without its terminator
///
/// `\n`, `\r\n` and a lone `\r` all end a line. Returns the number of bytes
/// consumed from `reader`, 0 at end of input.
fn read_raw_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    let mut consumed = 0;

    loop {
        let (terminator, used) = {
            let available = match reader.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                return Ok(consumed);
            }

            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(i) => {
                    buf.extend_from_slice(&available[..i]);
                    (Some(available[i]), i + 1)
                }
                None => {
                    buf.extend_from_slice(available);
                    (None, available.len())
                }
            }
        };

        reader.consume(used);
        consumed += used;

        match terminator {
            Some(b'\r') => {
                // The \n of a \r\n pair may only arrive with the next fill
                if reader.fill_buf()?.first() == Some(&b'\n') {
                    reader.consume(1);
                    consumed += 1;
                }
                return Ok(consumed);
            }
            Some(_) => return Ok(consumed),
            None => {}
        }
    }
}

/// Decode one unterminated line: replace invalid UTF-8, drop a BOM on the
/// first line
fn decode_line(raw: &[u8], first_line: bool) -> String {
    let text = String::from_utf8_lossy(raw);
    match text.strip_prefix('\u{feff}') {
        Some(rest) if first_line => rest.to_string(),
        _ => text.into_owned(),
    }
}

// ============================================================================
// STORE STAGING
// ============================================================================

/// Stores already resolved during this import, keyed by (name, owner_name)
///
/// Consulted before the repository so a store created on an earlier line
/// is reused even though it is not committed yet.
#[derive(Default)]
struct StagedStores {
    by_key: HashMap<(String, String), Store>,
    created: usize,
}

impl StagedStores {
    fn resolve<S: StoreRepository>(
        &mut self,
        repo: &mut S,
        name: &str,
        owner_name: &str,
    ) -> Result<Store, ImportError> {
        let key = (name.to_string(), owner_name.to_string());
        if let Some(store) = self.by_key.get(&key) {
            return Ok(store.clone());
        }

        let store = match repo.find_store(name, owner_name)? {
            Some(store) => store,
            None => {
                let store = repo.create_store(name, owner_name)?;
                self.created += 1;
                debug!(store_id = store.id, name, owner_name, "Created store");
                store
            }
        };

        self.by_key.insert(key, store.clone());
        Ok(store)
    }
}

// ============================================================================
// TESTS
// ============================================================================
