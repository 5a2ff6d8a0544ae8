use crate::core::error::DebiasError;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, DebiasError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(DebiasError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(DebiasError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(DebiasError::RusqliteError)?;
    Ok(conn)
}

pub fn ledger_db_path(root: &Path) -> PathBuf {
    root.join(schemas::LEDGER_DB_NAME)
}

pub fn initialize_ledger_db(root: &Path) -> Result<(), DebiasError> {
    let db_path = ledger_db_path(root);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).map_err(DebiasError::IoError)?;
    }

    let conn = db_connect(&db_path.to_string_lossy())?;
    conn.execute(schemas::LEDGER_DB_SCHEMA_ENTRIES, [])?;
    conn.execute(schemas::LEDGER_DB_SCHEMA_MODULE_INDEX, [])?;
    Ok(())
}
