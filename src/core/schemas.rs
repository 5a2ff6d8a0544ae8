//! Centralized database schema definitions.
//!
//! Debias keeps one SQLite database per store: `ledger.db`, the append-only
//! audit ledger. The table carries both hashes of the chain invariant; there
//! is deliberately no UPDATE or DELETE path anywhere in the codebase.

pub const LEDGER_DB_NAME: &str = "ledger.db";

pub const LEDGER_DB_SCHEMA_ENTRIES: &str = "
    CREATE TABLE IF NOT EXISTS ledger_entries (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        ts TEXT NOT NULL,
        module TEXT NOT NULL,
        action TEXT NOT NULL,
        payload TEXT NOT NULL,
        self_hash TEXT NOT NULL,
        previous_hash TEXT NOT NULL
    )
";

pub const LEDGER_DB_SCHEMA_MODULE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_ledger_module ON ledger_entries(module)";
