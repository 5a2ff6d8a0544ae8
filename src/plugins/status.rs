//! Workspace status: ledger health, per-module entry counts, generator
//! configuration, and event-log presence in one view.

use crate::core::config;
use crate::core::error::DebiasError;
use crate::core::ledger::{AuditLedger, LedgerFilter};
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::{decide, riskflag};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct WorkspaceStatus {
    pub ts: String,
    pub root: String,
    pub ledger_entries: usize,
    pub chain_valid: bool,
    pub entries_by_module: BTreeMap<String, usize>,
    pub generator_configured: bool,
    pub seed: u64,
    pub iterations: u32,
    pub event_logs: Vec<String>,
    pub alerts: Vec<String>,
}

pub fn get_status(store: &Store) -> Result<WorkspaceStatus, DebiasError> {
    let ledger = AuditLedger::open(store)?;
    let entries = ledger.query(&LedgerFilter::default())?;
    let report = ledger.verify_chain()?;

    let mut entries_by_module = BTreeMap::new();
    for e in &entries {
        *entries_by_module.entry(e.module.clone()).or_insert(0) += 1;
    }

    let engine_config = config::load_engine_config(&store.root)?;

    let mut event_logs = Vec::new();
    for path in [
        riskflag::events_path(&store.root),
        decide::events_path(&store.root),
    ] {
        if path.exists() {
            if let Some(name) = path.file_name() {
                event_logs.push(name.to_string_lossy().to_string());
            }
        }
    }

    let mut alerts = Vec::new();
    if !report.valid {
        alerts.push(format!(
            "Ledger chain broken at seq {}. Run: debias audit verify",
            report.broken_at_seq.unwrap_or(0)
        ));
    }
    if engine_config.generator.is_none() {
        alerts.push(
            "No generation service configured; pre-mortem content will use the fixed fallback set."
                .to_string(),
        );
    }

    Ok(WorkspaceStatus {
        ts: time::now_epoch_z(),
        root: store.root.to_string_lossy().to_string(),
        ledger_entries: entries.len(),
        chain_valid: report.valid,
        entries_by_module,
        generator_configured: engine_config.generator.is_some(),
        seed: engine_config.seed,
        iterations: engine_config.iterations,
        event_logs,
        alerts,
    })
}

pub fn run_status_cli(store: &Store, json: bool) -> Result<(), DebiasError> {
    let status = get_status(store)?;
    if json {
        let out = time::command_envelope(
            "status",
            "ok",
            serde_json::to_value(&status)
                .map_err(|e| DebiasError::ValidationError(format!("status encode: {}", e)))?,
        );
        println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        return Ok(());
    }

    println!("Workspace: {}", status.root);
    let chain = if status.chain_valid {
        "intact".green()
    } else {
        "BROKEN".red().bold()
    };
    println!("Ledger: {} entries, chain {}", status.ledger_entries, chain);
    for (module, count) in &status.entries_by_module {
        println!("  {}: {}", module, count);
    }
    println!(
        "Generator: {}  seed: {}  iterations: {}",
        if status.generator_configured {
            "configured".green()
        } else {
            "not configured".yellow()
        },
        status.seed,
        status.iterations
    );
    if !status.event_logs.is_empty() {
        println!("Event logs: {}", status.event_logs.join(", "));
    }
    for alert in &status.alerts {
        println!("{} {}", "!".yellow().bold(), alert);
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "status",
        "version": "0.1.0",
        "description": "Workspace and ledger health overview",
        "commands": [
            { "name": "status", "parameters": ["json"] }
        ],
        "storage": []
    })
}
