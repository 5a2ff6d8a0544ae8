use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DebiasError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Generation service error: {0}")]
    GenerationError(String),
    #[error("Ledger append failed: {0}")]
    LedgerWriteError(String),
    #[error("Ledger integrity violation at sequence {sequence}: {reason}")]
    LedgerIntegrity { sequence: i64, reason: String },
}
