//! Decision orchestration: scoring, protocol selection, optional pre-mortem
//! generation, determinism verification, record assembly, ledger append.
//!
//! A single request moves through the states Idle -> ScoringComplete ->
//! (ScenarioGenerationInFlight -> DeterminismVerified)? -> RecordAssembled ->
//! Logged. Generation failure is never fatal: the fixed fallback scenario set
//! keeps the audit trail complete, and the record is explicitly marked
//! fallback-sourced so it cannot masquerade as AI-verified analysis. A ledger
//! append failure, in contrast, is a hard error - the decision was computed
//! but is not yet durably logged, and the caller should retry the append.
//!
//! The ledger write happens after all external calls return; no lock is held
//! while the generation service is in flight.

use crate::core::bias::{self, BiasFinding};
use crate::core::config::EngineConfig;
use crate::core::determinism::{self, DeterminismReport, DeterminismTier};
use crate::core::error::DebiasError;
use crate::core::generation::{self, GenerationService};
use crate::core::hash;
use crate::core::ledger::{AuditLedger, LedgerEntry};
use crate::core::protocol::{
    self, DebiasProtocol, DecisionOutcome, RiskLevel, RuleInput,
};
use crate::core::risk::{self, ComponentScores, LimitingFactor, RiskFlag, ScarfProfile};
use crate::core::scenario::{
    self, ContentSource, ContrarianAnalysis, FailureScenario,
};
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DECISION_MODULE: &str = "decision-engine";
pub const DECISION_ACTION: &str = "decision.analyzed";

pub const DEFAULT_COMPLIANCE_TAGS: [&str; 5] = [
    "EU AI Act Art 10",
    "EU AI Act Art 13",
    "EU AI Act Art 14",
    "DORA Pillar 3",
    "NIST AI RMF Map 1.2",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub decision_text: String,
    #[serde(default)]
    pub known_risks: Vec<String>,
    #[serde(default)]
    pub risk_flag: Option<RiskFlag>,
    #[serde(default)]
    pub prior_conclusion: Option<String>,
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineState {
    Idle,
    ScoringComplete,
    ScenarioGenerationInFlight,
    DeterminismVerified,
    RecordAssembled,
    Logged,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineState::Idle => "IDLE",
            EngineState::ScoringComplete => "SCORING_COMPLETE",
            EngineState::ScenarioGenerationInFlight => "SCENARIO_GENERATION_IN_FLIGHT",
            EngineState::DeterminismVerified => "DETERMINISM_VERIFIED",
            EngineState::RecordAssembled => "RECORD_ASSEMBLED",
            EngineState::Logged => "LOGGED",
        };
        write!(f, "{}", label)
    }
}

/// Embedded summary of the input risk flag, as it stood when the decision
/// was made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFlagSummary {
    pub risk_active: bool,
    pub primary_driver: String,
    pub score: f64,
    pub zone: risk::ResilienceZone,
    pub limiting_factors: Vec<LimitingFactor>,
    pub scarf_threats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub outcome: DecisionOutcome,
    pub confidence_score: f64,
    /// Ordered trace of which facts and rules produced the outcome.
    pub causal_path: Vec<String>,
    pub trace_id: String,
}

/// The unit persisted to the ledger. Created once, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: String,
    pub timestamp: String,
    pub input_flag: RiskFlagSummary,
    pub risk_level: RiskLevel,
    pub rule_fired: String,
    pub protocols: Vec<DebiasProtocol>,
    pub bias_findings: Vec<BiasFinding>,
    pub recommendation: Recommendation,
    pub scenarios: Vec<FailureScenario>,
    pub content_source: ContentSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrarian: Option<ContrarianAnalysis>,
    /// Set downstream when a human overrides the recommendation; the engine
    /// always records false.
    pub user_override: bool,
    /// One-line digest of the drivers behind the outcome.
    pub executive_summary: String,
    pub input_hash: String,
    pub output_hash: String,
    pub seed: u64,
    pub determinism_tier: DeterminismTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub determinism: Option<DeterminismReport>,
    pub compliance_tags: Vec<String>,
}

pub struct DecisionOrchestrator<'a> {
    service: &'a dyn GenerationService,
    ledger: &'a AuditLedger,
    seed: u64,
    iterations: u32,
    state: EngineState,
}

impl<'a> DecisionOrchestrator<'a> {
    pub fn new(
        service: &'a dyn GenerationService,
        ledger: &'a AuditLedger,
        config: &EngineConfig,
    ) -> Self {
        DecisionOrchestrator {
            service,
            ledger,
            seed: config.seed,
            iterations: config.iterations,
            state: EngineState::Idle,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Runs the full pipeline for one request and returns the logged record.
    pub fn analyze(&mut self, request: &DecisionRequest) -> Result<DecisionRecord, DebiasError> {
        // Input validation happens before any scoring runs.
        if request.decision_text.trim().is_empty() {
            return Err(DebiasError::ValidationError(
                "decision text must not be empty".to_string(),
            ));
        }
        if let Some(flag) = &request.risk_flag {
            risk::validate_assessment(&flag.component_scores, &flag.scarf_profile)?;
        }

        let flag = request
            .risk_flag
            .clone()
            .unwrap_or_else(default_risk_flag);

        let limiting_factors = risk::identify_limiting_factors(&flag.component_scores);
        let scarf_threats = risk::identify_scarf_threats(&flag.scarf_profile);
        let findings = bias::detect(&request.decision_text);

        let rule_input = RuleInput {
            risk_active: flag.risk_active,
            score: flag.score,
            min_scarf: flag.scarf_profile.min_dimension(),
            scarf_threat_count: scarf_threats.len(),
            limiting_factor_count: limiting_factors.len(),
        };
        let (rule_fired, protocols) = protocol::select_protocols(&rule_input);
        let risk_level = protocol::determine_risk_level(&rule_input);
        self.state = EngineState::ScoringComplete;

        let bias_names: Vec<String> = findings.iter().map(|f| f.bias.to_string()).collect();

        // Pre-mortem phase, when the protocol demands one.
        let needs_pre_mortem = protocols.iter().any(DebiasProtocol::requires_pre_mortem);
        let mut scenarios = Vec::new();
        let mut content_source = ContentSource::Generated;
        let mut fallback_reason = None;
        let mut report: Option<DeterminismReport> = None;
        let mut input_hash = hash::content_hash(request)?;

        if needs_pre_mortem {
            let gen_request = generation::pre_mortem_request(
                &request.decision_text,
                &request.known_risks,
                &flag,
                &limiting_factors,
                &scarf_threats,
                &bias_names,
                self.seed,
            );
            input_hash = hash::content_hash(&gen_request)?;
            self.state = EngineState::ScenarioGenerationInFlight;

            match self
                .service
                .generate(&gen_request)
                .and_then(|v| scenario::parse_scenarios(&v))
            {
                Ok(mut generated) => {
                    scenario::normalize_probabilities(&mut generated);
                    scenarios = generated;
                    // Only generated content is worth re-running; the
                    // fallback set is fixed by construction.
                    report = Some(determinism::verify(
                        self.service,
                        &gen_request,
                        self.iterations,
                    )?);
                    self.state = EngineState::DeterminismVerified;
                }
                Err(e) => {
                    scenarios = scenario::fallback_scenarios();
                    content_source = ContentSource::Fallback;
                    fallback_reason = Some(e.to_string());
                }
            }
        }

        // Contrarian phase: independent call, independent fallback.
        let mut contrarian = None;
        if protocols.contains(&DebiasProtocol::ConsiderOpposite) {
            if let Some(conclusion) = &request.prior_conclusion {
                let gen_request = generation::contrarian_request(
                    conclusion,
                    &request.supporting_evidence,
                    &bias_names,
                    self.seed,
                );
                contrarian = Some(
                    self.service
                        .generate(&gen_request)
                        .and_then(|v| scenario::parse_contrarian(&v))
                        .unwrap_or_else(|_| scenario::fallback_contrarian()),
                );
            }
        }

        let determinism_tier = report
            .as_ref()
            .map(|r| r.tier)
            .unwrap_or(DeterminismTier::Deterministic);

        // A stochastic generation step caps the outcome regardless of what
        // the risk level alone would have produced.
        let mut outcome = protocol::baseline_outcome(risk_level, limiting_factors.len());
        if determinism_tier == DeterminismTier::Stochastic {
            outcome = DecisionOutcome::DelayPendingReview;
        }

        let mut confidence = (1.0 - findings.len() as f64 * 0.05).max(0.0);
        if let Some(r) = &report {
            confidence *= r.consistency_rate;
        }

        let causal_path = build_causal_path(
            &flag,
            &limiting_factors,
            &scarf_threats,
            &bias_names,
            rule_fired,
            &protocols,
            risk_level,
            outcome,
            content_source,
        );

        let executive_summary =
            build_executive_summary(risk_level, &limiting_factors, &bias_names, &scenarios);

        let output_hash = hash::content_hash(&serde_json::json!({
            "scenarios": scenarios,
            "protocols": protocols,
            "outcome": outcome,
        }))?;

        let record = DecisionRecord {
            id: time::new_event_id(),
            timestamp: time::now_epoch_z(),
            input_flag: RiskFlagSummary {
                risk_active: flag.risk_active,
                primary_driver: flag.primary_driver.clone(),
                score: flag.score,
                zone: flag.zone,
                limiting_factors,
                scarf_threats,
            },
            risk_level,
            rule_fired: rule_fired.to_string(),
            protocols,
            bias_findings: findings,
            recommendation: Recommendation {
                outcome,
                confidence_score: confidence,
                causal_path,
                trace_id: time::new_event_id(),
            },
            scenarios,
            content_source,
            fallback_reason,
            contrarian,
            user_override: false,
            executive_summary,
            input_hash,
            output_hash,
            seed: self.seed,
            determinism_tier,
            determinism: report,
            compliance_tags: DEFAULT_COMPLIANCE_TAGS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        };
        self.state = EngineState::RecordAssembled;

        let payload = serde_json::to_value(&record)
            .map_err(|e| DebiasError::ValidationError(format!("record encode: {}", e)))?;
        self.append_record(&payload)?;
        self.state = EngineState::Logged;

        Ok(record)
    }

    fn append_record(&self, payload: &serde_json::Value) -> Result<LedgerEntry, DebiasError> {
        self.ledger.append(DECISION_MODULE, DECISION_ACTION, payload)
    }
}

/// Moderate-signal flag used when a request arrives without one.
fn default_risk_flag() -> RiskFlag {
    risk::build_risk_flag(
        ComponentScores {
            environment: 70.0,
            adaptive_capacity: 3.5,
            validation: 75.0,
            neural_coefficient: 0.9,
        },
        ScarfProfile {
            status: 0.7,
            certainty: 0.7,
            autonomy: 0.7,
            relatedness: 0.7,
            fairness: 0.7,
        },
    )
}

fn build_executive_summary(
    risk_level: RiskLevel,
    limiting_factors: &[LimitingFactor],
    bias_names: &[String],
    scenarios: &[FailureScenario],
) -> String {
    let mut parts = vec![format!("Risk Level: {}", risk_level)];
    if !limiting_factors.is_empty() {
        parts.push(format!(
            "Limiting Factors: {}",
            limiting_factors
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    if !bias_names.is_empty() {
        parts.push(format!("Biases: {}", bias_names.join(", ")));
    }
    let top = scenarios.iter().max_by(|a, b| {
        a.probability
            .partial_cmp(&b.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if let Some(s) = top {
        parts.push(format!(
            "Primary Risk: {} ({:.0}%)",
            s.title,
            s.probability * 100.0
        ));
    }
    parts.join(" | ")
}

#[allow(clippy::too_many_arguments)]
fn build_causal_path(
    flag: &RiskFlag,
    limiting_factors: &[LimitingFactor],
    scarf_threats: &[String],
    bias_names: &[String],
    rule_fired: &str,
    protocols: &[DebiasProtocol],
    risk_level: RiskLevel,
    outcome: DecisionOutcome,
    content_source: ContentSource,
) -> Vec<String> {
    let mut path = vec![format!(
        "M1_INPUT:SCORE={:.1}|ZONE={}|RISK_ACTIVE={}",
        flag.score, flag.zone, flag.risk_active
    )];
    if !limiting_factors.is_empty() {
        path.push(format!(
            "LIMITING_FACTORS:{}",
            limiting_factors
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(",")
        ));
    }
    if !scarf_threats.is_empty() {
        path.push(format!("SCARF_THREATS:{}", scarf_threats.join(",")));
    }
    if !bias_names.is_empty() {
        path.push(format!("BIASES_DETECTED:{}", bias_names.join(",")));
    }
    path.push(format!("RULE:{}", rule_fired));
    path.push(format!(
        "PROTOCOLS:{}",
        protocols
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",")
    ));
    path.push(format!("RISK_LEVEL:{}", risk_level));
    if content_source == ContentSource::Fallback {
        path.push("CONTENT_SOURCE:FALLBACK".to_string());
    }
    path.push(format!("OUTCOME:{}", outcome));
    path
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "decision-engine",
        "version": "0.1.0",
        "description": "De-biasing decision orchestrator with determinism verification",
        "states": [
            "IDLE", "SCORING_COMPLETE", "SCENARIO_GENERATION_IN_FLIGHT",
            "DETERMINISM_VERIFIED", "RECORD_ASSEMBLED", "LOGGED"
        ],
        "events": ["decision.analyzed"],
        "storage": ["ledger.db (via ledger)", "decide.events.jsonl"]
    })
}
