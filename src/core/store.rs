//! Store abstraction for Debias state.
//!
//! A store is the on-disk workspace holding the audit ledger database, the
//! engine configuration, and the per-subsystem event logs, rooted at
//! `<project>/.debias/data/`.

use std::path::PathBuf;

/// Handle to a Debias state workspace.
///
/// All subsystem state (risk flags, decision records, ledger entries) is
/// scoped to a store. The ledger inside a store is one chain; two stores are
/// two independent chains.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the store root directory
    pub root: PathBuf,
}
