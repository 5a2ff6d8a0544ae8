//! Risk-sensor CLI: compute a resilience flag from component scores and a
//! SCARF profile, log it to the ledger, and report trigger conditions.

use crate::core::error::DebiasError;
use crate::core::ledger::AuditLedger;
use crate::core::risk::{self, ComponentScores, RiskFlag, ScarfProfile};
use crate::core::store::Store;
use crate::core::time;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::Value as JsonValue;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const RISKFLAG_MODULE: &str = "risk-sensor";
pub const RISKFLAG_ACTION: &str = "riskflag.assessed";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(name = "riskflag", about = "Assess organizational resilience and raise risk flags.")]
pub struct RiskflagCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: RiskflagCommand,
}

#[derive(Subcommand, Debug)]
pub enum RiskflagCommand {
    /// Score component inputs, derive the zone, and log the flag.
    Assess {
        /// Environmental support score, 0-100.
        #[clap(long)]
        environment: f64,
        /// Adaptive capacity, 0-5.
        #[clap(long)]
        capacity: f64,
        /// Validation (say-do) score, 0-100.
        #[clap(long)]
        validation: f64,
        /// Neural readiness coefficient, 0-1.
        #[clap(long)]
        neural: f64,
        #[clap(long, default_value = "0.7")]
        scarf_status: f64,
        #[clap(long, default_value = "0.7")]
        scarf_certainty: f64,
        #[clap(long, default_value = "0.7")]
        scarf_autonomy: f64,
        #[clap(long, default_value = "0.7")]
        scarf_relatedness: f64,
        #[clap(long, default_value = "0.7")]
        scarf_fairness: f64,
    },
}

pub fn events_path(root: &Path) -> PathBuf {
    root.join("riskflag.events.jsonl")
}

fn append_event(root: &Path, ev: &JsonValue) -> Result<(), DebiasError> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(events_path(root))
        .map_err(DebiasError::IoError)?;
    writeln!(f, "{}", ev).map_err(DebiasError::IoError)?;
    Ok(())
}

/// Compute, validate, log, and return a flag. Library entry point shared by
/// the CLI and the decision engine's explicit-flag path.
pub fn assess(
    store: &Store,
    scores: ComponentScores,
    profile: ScarfProfile,
) -> Result<RiskFlag, DebiasError> {
    risk::validate_assessment(&scores, &profile)?;
    let flag = risk::build_risk_flag(scores, profile);

    let ledger = AuditLedger::open(store)?;
    let payload = serde_json::to_value(&flag)
        .map_err(|e| DebiasError::ValidationError(format!("flag encode: {}", e)))?;
    ledger.append(RISKFLAG_MODULE, RISKFLAG_ACTION, &payload)?;

    let ev = serde_json::json!({
        "event_id": time::new_event_id(),
        "ts": time::now_epoch_z(),
        "event_type": RISKFLAG_ACTION,
        "risk_active": flag.risk_active,
        "score": flag.score,
        "zone": flag.zone,
    });
    append_event(&store.root, &ev)?;

    Ok(flag)
}

pub fn run_riskflag_cli(store: &Store, cli: RiskflagCli) -> Result<(), DebiasError> {
    match &cli.command {
        RiskflagCommand::Assess {
            environment,
            capacity,
            validation,
            neural,
            scarf_status,
            scarf_certainty,
            scarf_autonomy,
            scarf_relatedness,
            scarf_fairness,
        } => {
            let flag = assess(
                store,
                ComponentScores {
                    environment: *environment,
                    adaptive_capacity: *capacity,
                    validation: *validation,
                    neural_coefficient: *neural,
                },
                ScarfProfile {
                    status: *scarf_status,
                    certainty: *scarf_certainty,
                    autonomy: *scarf_autonomy,
                    relatedness: *scarf_relatedness,
                    fairness: *scarf_fairness,
                },
            )?;

            match cli.format {
                OutputFormat::Json => {
                    let out = time::command_envelope(
                        "riskflag.assess",
                        "ok",
                        serde_json::json!({ "flag": flag }),
                    );
                    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
                }
                OutputFormat::Text => print_flag(&flag),
            }
        }
    }
    Ok(())
}

fn print_flag(flag: &RiskFlag) {
    let flag_line = if flag.risk_active {
        "RISK FLAG ACTIVE".red().bold()
    } else {
        "no active risk flag".green()
    };
    println!("{}", flag_line);
    println!("  score: {:.1}  zone: {}", flag.score, flag.zone);
    if flag.risk_active {
        println!("  primary driver: {}", flag.primary_driver);
    }
    if !flag.trigger_conditions.is_empty() {
        println!("  trigger conditions:");
        for c in &flag.trigger_conditions {
            println!("    - {}", c.to_string().yellow());
        }
    }
    let factors = risk::identify_limiting_factors(&flag.component_scores);
    if !factors.is_empty() {
        println!("  limiting factors:");
        for f in &factors {
            println!("    - {}", f);
        }
    }
    let threats = risk::identify_scarf_threats(&flag.scarf_profile);
    if !threats.is_empty() {
        println!("  scarf threats: {}", threats.join(", "));
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "riskflag",
        "version": "0.1.0",
        "description": "Resilience scoring and risk-flag assessment",
        "commands": [
            { "name": "assess", "parameters": [
                "environment", "capacity", "validation", "neural",
                "scarf-status", "scarf-certainty", "scarf-autonomy",
                "scarf-relatedness", "scarf-fairness"
            ] }
        ],
        "storage": ["ledger.db", "riskflag.events.jsonl"]
    })
}
