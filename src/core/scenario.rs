//! Failure-scenario and contrarian-analysis content: strict parsing of
//! generation-service responses, probability normalization, and the fixed
//! fallback sets used when the service fails.
//!
//! Parsing is schema-strict at the boundary: a missing or misnamed field is a
//! structured parse error, never a silent default. The orchestrator treats
//! any parse error like a service failure and falls back.

use crate::core::error::DebiasError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

pub const SCENARIOS_PER_PRE_MORTEM: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    Operational,
    Financial,
    Reputational,
    Regulatory,
    Strategic,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskCategory::Operational => "OPERATIONAL",
            RiskCategory::Financial => "FINANCIAL",
            RiskCategory::Reputational => "REPUTATIONAL",
            RiskCategory::Regulatory => "REGULATORY",
            RiskCategory::Strategic => "STRATEGIC",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureScenario {
    pub title: String,
    pub probability: f64,
    pub description: String,
    pub mitigation_strategy: String,
    pub risk_category: RiskCategory,
}

/// Whether pre-mortem/contrarian content came from the generation service or
/// from the fixed fallback set. Recorded on every decision so fallback output
/// is never mistaken for AI-verified analysis in an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentSource {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContrarianAction {
    Proceed,
    Modify,
    Reconsider,
}

impl fmt::Display for ContrarianAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContrarianAction::Proceed => "PROCEED",
            ContrarianAction::Modify => "MODIFY",
            ContrarianAction::Reconsider => "RECONSIDER",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContrarianAnalysis {
    pub counter_arguments: Vec<String>,
    pub alternative_hypothesis: String,
    pub disconfirming_evidence: String,
    pub recommended_action: ContrarianAction,
}

/// Strictly parse a generation response into exactly three scenarios with
/// non-negative, finite probabilities.
pub fn parse_scenarios(value: &JsonValue) -> Result<Vec<FailureScenario>, DebiasError> {
    let scenarios: Vec<FailureScenario> = serde_json::from_value(value.clone())
        .map_err(|e| DebiasError::GenerationError(format!("scenario parse error: {}", e)))?;

    if scenarios.len() != SCENARIOS_PER_PRE_MORTEM {
        return Err(DebiasError::GenerationError(format!(
            "expected exactly {} scenarios, got {}",
            SCENARIOS_PER_PRE_MORTEM,
            scenarios.len()
        )));
    }
    for s in &scenarios {
        if !s.probability.is_finite() || s.probability < 0.0 {
            return Err(DebiasError::GenerationError(format!(
                "scenario '{}' has invalid probability {}",
                s.title, s.probability
            )));
        }
    }
    Ok(scenarios)
}

pub fn parse_contrarian(value: &JsonValue) -> Result<ContrarianAnalysis, DebiasError> {
    serde_json::from_value(value.clone())
        .map_err(|e| DebiasError::GenerationError(format!("contrarian parse error: {}", e)))
}

/// Rescale probabilities to sum to 1.0, rounding to three decimals. A zero
/// total leaves the scenarios untouched.
pub fn normalize_probabilities(scenarios: &mut [FailureScenario]) {
    let total: f64 = scenarios.iter().map(|s| s.probability).sum();
    if total > 0.0 {
        for s in scenarios.iter_mut() {
            s.probability = (s.probability / total * 1000.0).round() / 1000.0;
        }
    }
}

/// The fixed generic set, one scenario per broad category, so a decision
/// record is still produced and logged when generation fails.
pub fn fallback_scenarios() -> Vec<FailureScenario> {
    vec![
        FailureScenario {
            title: "Organizational Resistance".to_string(),
            probability: 0.35,
            description: "Key stakeholders resist the change due to cultural inertia and fear of \
                          disruption to established workflows, leading to passive resistance, \
                          workarounds, and eventual abandonment."
                .to_string(),
            mitigation_strategy: "Run structured change management with stakeholder mapping. \
                                  Address concerns before rollout and secure visible executive \
                                  sponsorship."
                .to_string(),
            risk_category: RiskCategory::Operational,
        },
        FailureScenario {
            title: "Resource Underestimation".to_string(),
            probability: 0.35,
            description: "Scope expanded beyond initial estimates, depleting budget and \
                          extending timelines until executive confidence was lost and the \
                          initiative was defunded."
                .to_string(),
            mitigation_strategy: "Enforce scope governance with a change control board, keep a \
                                  20% contingency buffer, and reassess at fixed checkpoints."
                .to_string(),
            risk_category: RiskCategory::Financial,
        },
        FailureScenario {
            title: "Market Timing Failure".to_string(),
            probability: 0.30,
            description: "External conditions shifted unexpectedly; competitor moves or \
                          regulatory changes undermined the strategic rationale before delivery."
                .to_string(),
            mitigation_strategy: "Monitor the market on a monthly cadence, design pivot points \
                                  into the plan, and define objective go/no-go criteria."
                .to_string(),
            risk_category: RiskCategory::Strategic,
        },
    ]
}

/// Conservative counter-position used when the contrarian call fails.
pub fn fallback_contrarian() -> ContrarianAnalysis {
    ContrarianAnalysis {
        counter_arguments: vec![
            "The proposed approach may overlook critical stakeholder concerns".to_string(),
            "Alternative solutions have not been adequately explored".to_string(),
            "The risk assessment may underestimate potential negative outcomes".to_string(),
        ],
        alternative_hypothesis: "The current approach may not be optimal given the constraints \
                                 and context."
            .to_string(),
        disconfirming_evidence: "Historical data shows similar initiatives have faced \
                                 significant challenges."
            .to_string(),
        recommended_action: ContrarianAction::Reconsider,
    }
}
