//! Decision-engine CLI: full analysis pipeline and standalone bias scans.

use crate::core::config::{self, EngineConfig};
use crate::core::error::DebiasError;
use crate::core::generation::{CommandGenerator, GenerationService, UnconfiguredGenerator};
use crate::core::ledger::AuditLedger;
use crate::core::orchestrator::{DecisionOrchestrator, DecisionRecord, DecisionRequest};
use crate::core::risk::{ComponentScores, ScarfProfile};
use crate::core::scenario::ContentSource;
use crate::core::store::Store;
use crate::core::time;
use crate::core::{bias, risk};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::Value as JsonValue;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(name = "decide", about = "Run de-biased decision analysis.")]
pub struct DecideCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: DecideCommand,
}

#[derive(Subcommand, Debug)]
pub enum DecideCommand {
    /// Analyze a decision: score, select protocols, generate pre-mortem
    /// content when required, verify determinism, and log the record.
    Analyze {
        /// Decision text under analysis (positional argument).
        #[clap(value_name = "TEXT")]
        text: String,
        /// Known risk, repeatable.
        #[clap(long = "risk")]
        risks: Vec<String>,
        /// Prior conclusion, enables consider-the-opposite analysis.
        #[clap(long)]
        conclusion: Option<String>,
        /// Evidence supporting the prior conclusion, repeatable.
        #[clap(long = "evidence")]
        evidence: Vec<String>,
        /// Path to a JSON risk flag produced by `riskflag assess --format json`.
        #[clap(long)]
        flag_file: Option<String>,
        /// Override the configured generation seed.
        #[clap(long)]
        seed: Option<u64>,
        /// Inline flag components, as environment,capacity,validation,neural.
        #[clap(long, value_delimiter = ',', num_args = 4)]
        components: Option<Vec<f64>>,
    },
    /// Scan text for cognitive-bias language without running the pipeline.
    Biases {
        #[clap(value_name = "TEXT")]
        text: String,
    },
}

pub fn events_path(root: &Path) -> PathBuf {
    root.join("decide.events.jsonl")
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

fn load_flag_file(path: &str) -> Result<risk::RiskFlag, DebiasError> {
    let content = fs::read_to_string(path).map_err(DebiasError::IoError)?;
    let value: JsonValue = serde_json::from_str(&content)
        .map_err(|e| DebiasError::ValidationError(format!("flag file parse: {}", e)))?;
    // Accept either a bare flag or the assess command envelope.
    let flag_value = value.get("flag").unwrap_or(&value);
    serde_json::from_value(flag_value.clone())
        .map_err(|e| DebiasError::ValidationError(format!("flag file decode: {}", e)))
}

/// Run one analysis against a store with the given config. Library entry
/// point shared by the CLI and tests.
pub fn analyze(
    store: &Store,
    config: &EngineConfig,
    request: &DecisionRequest,
    seed_override: Option<u64>,
) -> Result<DecisionRecord, DebiasError> {
    let command_service;
    let unconfigured_service;
    let service: &dyn GenerationService = match &config.generator {
        Some(generator) => {
            command_service = CommandGenerator::new(generator);
            &command_service
        }
        None => {
            unconfigured_service = UnconfiguredGenerator;
            &unconfigured_service
        }
    };

    let ledger = AuditLedger::open(store)?;
    let mut orchestrator = DecisionOrchestrator::new(service, &ledger, config);
    if let Some(seed) = seed_override {
        orchestrator = orchestrator.with_seed(seed);
    }
    let record = orchestrator.analyze(request)?;

    let ev = serde_json::json!({
        "event_id": time::new_event_id(),
        "ts": time::now_epoch_z(),
        "event_type": "decision.analyzed",
        "decision_id": record.id,
        "outcome": record.recommendation.outcome,
        "risk_level": record.risk_level,
        "content_source": record.content_source,
        "determinism_tier": record.determinism_tier,
    });
    append_event(&store.root, &ev)?;

    Ok(record)
}

pub fn run_decide_cli(store: &Store, cli: DecideCli) -> Result<(), DebiasError> {
    match &cli.command {
        DecideCommand::Analyze {
            text,
            risks,
            conclusion,
            evidence,
            flag_file,
            seed,
            components,
        } => {
            let risk_flag = match (flag_file, components) {
                (Some(path), _) => Some(load_flag_file(path)?),
                (None, Some(c)) => Some(risk::build_risk_flag(
                    ComponentScores {
                        environment: c[0],
                        adaptive_capacity: c[1],
                        validation: c[2],
                        neural_coefficient: c[3],
                    },
                    ScarfProfile {
                        status: 0.7,
                        certainty: 0.7,
                        autonomy: 0.7,
                        relatedness: 0.7,
                        fairness: 0.7,
                    },
                )),
                (None, None) => None,
            };

            let request = DecisionRequest {
                decision_text: text.clone(),
                known_risks: risks.clone(),
                risk_flag,
                prior_conclusion: conclusion.clone(),
                supporting_evidence: evidence.clone(),
            };

            let config = config::load_engine_config(&store.root)?;
            let record = analyze(store, &config, &request, *seed)?;

            match cli.format {
                OutputFormat::Json => {
                    let out = time::command_envelope(
                        "decide.analyze",
                        "ok",
                        serde_json::json!({ "record": record }),
                    );
                    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
                }
                OutputFormat::Text => print_record(&record),
            }
        }
        DecideCommand::Biases { text } => {
            let findings = bias::detect(text);
            match cli.format {
                OutputFormat::Json => {
                    let out = time::command_envelope(
                        "decide.biases",
                        "ok",
                        serde_json::json!({ "findings": findings }),
                    );
                    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
                }
                OutputFormat::Text => {
                    if findings.is_empty() {
                        println!("{}", "No bias language detected.".green());
                    } else {
                        println!("{} finding(s):", findings.len());
                        for f in &findings {
                            println!(
                                "- {} [{}]",
                                f.bias.to_string().yellow().bold(),
                                f.severity
                            );
                            println!("    {}", f.description);
                            println!("    evidence: {}", f.evidence);
                            println!("    mitigation: {}", f.mitigation);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_record(record: &DecisionRecord) {
    let outcome = record.recommendation.outcome.to_string();
    let outcome_colored = match record.recommendation.outcome {
        crate::core::protocol::DecisionOutcome::Proceed => outcome.green().bold(),
        crate::core::protocol::DecisionOutcome::ProceedWithControls => outcome.yellow().bold(),
        _ => outcome.red().bold(),
    };
    println!("decision {}  {}", record.id, outcome_colored);
    println!("  {}", record.executive_summary);
    println!(
        "  risk level: {}  rule: {}",
        record.risk_level, record.rule_fired
    );
    println!(
        "  protocols: {}",
        record
            .protocols
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "  confidence: {:.2}  determinism: {}",
        record.recommendation.confidence_score, record.determinism_tier
    );
    if record.content_source == ContentSource::Fallback {
        println!(
            "  {}",
            "pre-mortem content is the fixed fallback set (generation unavailable)".yellow()
        );
        if let Some(reason) = &record.fallback_reason {
            println!("  reason: {}", reason);
        }
    }
    if !record.bias_findings.is_empty() {
        println!("  biases detected:");
        for f in &record.bias_findings {
            println!("    - {} [{}]: {}", f.bias, f.severity, f.evidence);
        }
    }
    if !record.scenarios.is_empty() {
        println!("  failure scenarios:");
        for s in &record.scenarios {
            println!(
                "    - {} (p={:.2}, {})",
                s.title, s.probability, s.risk_category
            );
        }
    }
    if let Some(c) = &record.contrarian {
        println!("  contrarian action: {}", c.recommended_action);
    }
    println!("  causal path:");
    for step in &record.recommendation.causal_path {
        println!("    {}", step);
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "decide",
        "version": "0.1.0",
        "description": "De-biased decision analysis pipeline",
        "commands": [
            { "name": "analyze", "parameters": [
                "text", "risk", "conclusion", "evidence", "flag-file",
                "seed", "components"
            ] },
            { "name": "biases", "parameters": ["text"] }
        ],
        "storage": ["ledger.db", "decide.events.jsonl"]
    })
}
