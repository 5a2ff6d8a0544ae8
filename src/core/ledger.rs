//! Hash-chained, append-only audit ledger.
//!
//! Every entry's hash incorporates the previous entry's hash, so retroactive
//! tampering is detectable by a full-chain walk. Appends are the one shared
//! mutation in the system: the chain invariant depends on reading the true
//! tail and writing the next entry as a single unit with respect to every
//! other writer, including other handles and other processes on the same
//! store. Each append therefore runs inside one immediate write transaction,
//! with a bounded retry when another writer holds the database. Reads run
//! concurrently with appends; a verify racing an in-flight append may simply
//! not see the new tail yet, which is fine for an append-only structure.
//!
//! There is no update or delete operation, and a broken chain is never
//! auto-repaired - it is evidence of tampering or a storage bug and is
//! reported with the exact break point.

use crate::core::db;
use crate::core::error::DebiasError;
use crate::core::hash;
use crate::core::store::Store;
use crate::core::time;
use rusqlite::{ErrorCode, OptionalExtension, TransactionBehavior, params};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::path::PathBuf;
use std::time::Duration;

pub const GENESIS_HASH: &str = "GENESIS_HASH_0000000000000000";

const APPEND_BUSY_RETRIES: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub seq: i64,
    pub ts: String,
    pub module: String,
    pub action: String,
    pub payload: JsonValue,
    pub self_hash: String,
    pub previous_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub module: Option<String>,
    pub limit: Option<usize>,
    /// Insertion order, oldest first, unless set.
    pub newest_first: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainReport {
    pub valid: bool,
    pub entries_checked: usize,
    pub broken_at_seq: Option<i64>,
    pub reason: Option<String>,
}

pub struct AuditLedger {
    db_path: PathBuf,
}

fn compute_entry_hash(
    ts: &str,
    module: &str,
    action: &str,
    payload: &JsonValue,
    previous_hash: &str,
) -> String {
    let body = json!({
        "ts": ts,
        "module": module,
        "action": action,
        "payload": payload,
    });
    hash::sha256_hex(&format!("{}{}", hash::canonical_json(&body), previous_hash))
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == ErrorCode::DatabaseBusy || f.code == ErrorCode::DatabaseLocked
    )
}

impl AuditLedger {
    pub fn open(store: &Store) -> Result<Self, DebiasError> {
        db::initialize_ledger_db(&store.root)?;
        Ok(AuditLedger {
            db_path: db::ledger_db_path(&store.root),
        })
    }

    /// Appends a payload as the new tail entry. Tail read and insert commit
    /// as one write transaction, so concurrent appenders on any handle or
    /// process serialize cleanly. Failures are hard errors distinct from
    /// generation failures (the caller's decision is computed but not yet
    /// durably logged, and should be re-appended, not recomputed).
    pub fn append(
        &self,
        module: &str,
        action: &str,
        payload: &JsonValue,
    ) -> Result<LedgerEntry, DebiasError> {
        let mut attempt = 0;
        loop {
            match self.append_once(module, action, payload) {
                Err(DebiasError::RusqliteError(e)) if is_busy(&e) => {
                    if attempt >= APPEND_BUSY_RETRIES {
                        return Err(DebiasError::LedgerWriteError(format!(
                            "database busy after {} retries: {}",
                            APPEND_BUSY_RETRIES, e
                        )));
                    }
                    attempt += 1;
                    std::thread::sleep(Duration::from_millis(20 * u64::from(attempt)));
                }
                Err(DebiasError::RusqliteError(e)) => {
                    return Err(DebiasError::LedgerWriteError(e.to_string()));
                }
                other => return other,
            }
        }
    }

    fn append_once(
        &self,
        module: &str,
        action: &str,
        payload: &JsonValue,
    ) -> Result<LedgerEntry, DebiasError> {
        let mut conn = db::db_connect(&self.db_path.to_string_lossy())?;
        // Immediate mode takes the write lock before the tail read, so no
        // other writer can slip an entry in between the read and the insert.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let previous_hash: String = tx
            .query_row(
                "SELECT self_hash FROM ledger_entries ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let ts = time::now_epoch_z();
        let self_hash = compute_entry_hash(&ts, module, action, payload, &previous_hash);
        let payload_text = serde_json::to_string(payload)
            .map_err(|e| DebiasError::LedgerWriteError(format!("payload encode: {}", e)))?;

        tx.execute(
            "INSERT INTO ledger_entries (ts, module, action, payload, self_hash, previous_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![ts, module, action, payload_text, self_hash, previous_hash],
        )?;
        let seq = tx.last_insert_rowid();
        tx.commit()?;

        Ok(LedgerEntry {
            seq,
            ts,
            module: module.to_string(),
            action: action.to_string(),
            payload: payload.clone(),
            self_hash,
            previous_hash,
        })
    }

    /// Walks the full chain from genesis, recomputing each entry's hash from
    /// its stored payload and checking link continuity. Reports the first
    /// sequence number where either check fails. Empty and single-entry
    /// ledgers are trivially valid (the single entry still gets recomputed).
    pub fn verify_chain(&self) -> Result<ChainReport, DebiasError> {
        let entries = self.query(&LedgerFilter::default())?;
        let mut expected_previous = GENESIS_HASH.to_string();

        for (i, entry) in entries.iter().enumerate() {
            if entry.previous_hash != expected_previous {
                return Ok(ChainReport {
                    valid: false,
                    entries_checked: i + 1,
                    broken_at_seq: Some(entry.seq),
                    reason: Some("previous-hash link does not match prior entry".to_string()),
                });
            }
            let recomputed = compute_entry_hash(
                &entry.ts,
                &entry.module,
                &entry.action,
                &entry.payload,
                &entry.previous_hash,
            );
            if recomputed != entry.self_hash {
                return Ok(ChainReport {
                    valid: false,
                    entries_checked: i + 1,
                    broken_at_seq: Some(entry.seq),
                    reason: Some("stored hash does not match recomputed content".to_string()),
                });
            }
            expected_previous = entry.self_hash.clone();
        }

        Ok(ChainReport {
            valid: true,
            entries_checked: entries.len(),
            broken_at_seq: None,
            reason: None,
        })
    }

    pub fn query(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, DebiasError> {
        let conn = db::db_connect(&self.db_path.to_string_lossy())?;

        let order = if filter.newest_first { "DESC" } else { "ASC" };
        let mut sql = format!(
            "SELECT seq, ts, module, action, payload, self_hash, previous_hash
             FROM ledger_entries {} ORDER BY seq {}",
            if filter.module.is_some() {
                "WHERE module = ?1"
            } else {
                ""
            },
            order
        );
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<(i64, String, String, String, String, String, String)> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        };

        let rows: Vec<_> = if let Some(module) = &filter.module {
            stmt.query_map(params![module], map_row)?
                .collect::<rusqlite::Result<_>>()?
        } else {
            stmt.query_map([], map_row)?
                .collect::<rusqlite::Result<_>>()?
        };

        let mut entries = Vec::with_capacity(rows.len());
        for (seq, ts, module, action, payload_text, self_hash, previous_hash) in rows {
            // An unparsable payload is surfaced as corruption, not skipped.
            let payload = serde_json::from_str(&payload_text).map_err(|e| {
                DebiasError::LedgerIntegrity {
                    sequence: seq,
                    reason: format!("stored payload is not valid JSON: {}", e),
                }
            })?;
            entries.push(LedgerEntry {
                seq,
                ts,
                module,
                action,
                payload,
                self_hash,
                previous_hash,
            });
        }
        Ok(entries)
    }

    pub fn count(&self) -> Result<usize, DebiasError> {
        let conn = db::db_connect(&self.db_path.to_string_lossy())?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM ledger_entries", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "ledger",
        "version": "0.1.0",
        "description": "Append-only hash-chained audit ledger",
        "genesis_hash": GENESIS_HASH,
        "invariants": [
            "self_hash == SHA256(canonical(entry) + previous_hash)",
            "entry[i].previous_hash == entry[i-1].self_hash",
            "entry[0].previous_hash == genesis"
        ],
        "storage": ["ledger.db"]
    })
}
