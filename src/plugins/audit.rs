//! Audit CLI over the hash-chained ledger: query entries, verify chain
//! integrity, and export a human-readable transcript.

use crate::core::error::DebiasError;
use crate::core::ledger::{AuditLedger, ChainReport, LedgerEntry, LedgerFilter};
use crate::core::store::Store;
use crate::core::time;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::Path;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(name = "audit", about = "Inspect and verify the hash-chained audit ledger.")]
pub struct AuditCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: AuditCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// List ledger entries, newest first.
    Logs {
        /// Filter by logging module (e.g. decision-engine, risk-sensor).
        #[clap(long)]
        module: Option<String>,
        #[clap(long, default_value = "20")]
        limit: usize,
        /// Walk from the genesis entry instead of the tail.
        #[clap(long)]
        oldest_first: bool,
    },
    /// Recompute every hash link and report the first break, if any.
    Verify,
    /// Write the full chain to a markdown transcript.
    Export {
        /// Output path for the transcript.
        #[clap(long, default_value = "audit-transcript.md")]
        out: String,
    },
}

pub fn run_audit_cli(store: &Store, cli: AuditCli) -> Result<(), DebiasError> {
    let ledger = AuditLedger::open(store)?;
    match &cli.command {
        AuditCommand::Logs {
            module,
            limit,
            oldest_first,
        } => {
            let entries = ledger.query(&LedgerFilter {
                module: module.clone(),
                limit: Some(*limit),
                newest_first: !oldest_first,
            })?;
            match cli.format {
                OutputFormat::Json => {
                    let out = time::command_envelope(
                        "audit.logs",
                        "ok",
                        serde_json::json!({ "entries": entries }),
                    );
                    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
                }
                OutputFormat::Text => {
                    if entries.is_empty() {
                        println!("Ledger is empty.");
                        return Ok(());
                    }
                    for e in &entries {
                        println!(
                            "#{} {} {} {} {}",
                            e.seq,
                            e.ts,
                            e.module.cyan(),
                            e.action,
                            &e.self_hash[..12.min(e.self_hash.len())]
                        );
                    }
                }
            }
        }
        AuditCommand::Verify => {
            let report = ledger.verify_chain()?;
            match cli.format {
                OutputFormat::Json => {
                    let status = if report.valid { "ok" } else { "broken" };
                    let out = time::command_envelope(
                        "audit.verify",
                        status,
                        serde_json::json!({ "report": report }),
                    );
                    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
                }
                OutputFormat::Text => print_report(&report),
            }
            if !report.valid {
                return Err(DebiasError::LedgerIntegrity {
                    sequence: report.broken_at_seq.unwrap_or(0),
                    reason: report
                        .reason
                        .unwrap_or_else(|| "chain verification failed".to_string()),
                });
            }
        }
        AuditCommand::Export { out } => {
            let entries = ledger.query(&LedgerFilter {
                module: None,
                limit: None,
                newest_first: false,
            })?;
            let report = ledger.verify_chain()?;
            let transcript = render_transcript(&entries, &report);
            fs::write(Path::new(out), transcript).map_err(DebiasError::IoError)?;
            println!(
                "Exported {} entries to {}",
                entries.len(),
                out.bold()
            );
        }
    }
    Ok(())
}

fn print_report(report: &ChainReport) {
    if report.valid {
        println!(
            "{} ({} entries checked)",
            "chain intact".green().bold(),
            report.entries_checked
        );
    } else {
        println!(
            "{} at seq {}",
            "CHAIN BROKEN".red().bold(),
            report.broken_at_seq.unwrap_or(0)
        );
        if let Some(reason) = &report.reason {
            println!("  reason: {}", reason);
        }
        println!("  entries checked before break: {}", report.entries_checked);
    }
}

fn render_transcript(entries: &[LedgerEntry], report: &ChainReport) -> String {
    let mut out = String::from("# Audit Ledger Transcript\n\n");
    out.push_str(&format!("Generated: {}\n", time::now_epoch_z()));
    out.push_str(&format!("Entries: {}\n", entries.len()));
    out.push_str(&format!(
        "Chain: {}\n\n",
        if report.valid {
            "intact".to_string()
        } else {
            format!("BROKEN at seq {}", report.broken_at_seq.unwrap_or(0))
        }
    ));
    for e in entries {
        out.push_str(&format!("## Entry {}\n\n", e.seq));
        out.push_str(&format!("- ts: {}\n", e.ts));
        out.push_str(&format!("- module: {}\n", e.module));
        out.push_str(&format!("- action: {}\n", e.action));
        out.push_str(&format!("- self_hash: {}\n", e.self_hash));
        out.push_str(&format!("- previous_hash: {}\n\n", e.previous_hash));
        out.push_str("```json\n");
        out.push_str(
            &serde_json::to_string_pretty(&e.payload).unwrap_or_else(|_| "{}".to_string()),
        );
        out.push_str("\n```\n\n");
    }
    out
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "audit",
        "version": "0.1.0",
        "description": "Hash-chained audit ledger inspection",
        "commands": [
            { "name": "logs", "parameters": ["module", "limit", "oldest-first"] },
            { "name": "verify" },
            { "name": "export", "parameters": ["out"] }
        ],
        "storage": ["ledger.db"]
    })
}
