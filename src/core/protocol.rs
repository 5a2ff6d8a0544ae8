//! De-biasing protocol selection: an ordered decision table.
//!
//! Rules are evaluated top to bottom and the first match wins. Ordering is
//! load-bearing: an active risk flag must short-circuit everything else, and
//! the severity bands below it are deliberately asymmetric. The table is an
//! explicit array of named rules so the ordering stays auditable and each
//! rule is unit-testable in isolation.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebiasProtocol {
    Standard,
    ConsiderOpposite,
    PreMortemAdvisory,
    PreMortemMandatory,
}

impl fmt::Display for DebiasProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DebiasProtocol::Standard => "STANDARD",
            DebiasProtocol::ConsiderOpposite => "CONSIDER_OPPOSITE",
            DebiasProtocol::PreMortemAdvisory => "PRE_MORTEM_ADVISORY",
            DebiasProtocol::PreMortemMandatory => "PRE_MORTEM_MANDATORY",
        };
        write!(f, "{}", label)
    }
}

impl DebiasProtocol {
    pub fn requires_pre_mortem(&self) -> bool {
        matches!(
            self,
            DebiasProtocol::PreMortemMandatory | DebiasProtocol::PreMortemAdvisory
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    Proceed,
    ProceedWithControls,
    DelayPendingReview,
    AbortRecommended,
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DecisionOutcome::Proceed => "PROCEED",
            DecisionOutcome::ProceedWithControls => "PROCEED_WITH_CONTROLS",
            DecisionOutcome::DelayPendingReview => "DELAY_PENDING_REVIEW",
            DecisionOutcome::AbortRecommended => "ABORT_RECOMMENDED",
        };
        write!(f, "{}", label)
    }
}

/// The facts a rule may look at. Derived once per decision from the risk
/// flag, limiting factors, and SCARF threats.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput {
    pub risk_active: bool,
    pub score: f64,
    pub min_scarf: f64,
    pub scarf_threat_count: usize,
    pub limiting_factor_count: usize,
}

pub struct ProtocolRule {
    pub name: &'static str,
    pub applies: fn(&RuleInput) -> bool,
    pub protocols: &'static [DebiasProtocol],
}

/// First matching rule wins; the final rule is a catch-all.
pub static PROTOCOL_RULES: [ProtocolRule; 8] = [
    ProtocolRule {
        name: "risk-flag-active",
        applies: |input| input.risk_active,
        protocols: &[DebiasProtocol::PreMortemMandatory],
    },
    ProtocolRule {
        name: "score-critical",
        applies: |input| input.score < 55.0,
        protocols: &[DebiasProtocol::PreMortemMandatory],
    },
    ProtocolRule {
        name: "score-low-with-scarf-threat",
        applies: |input| input.score < 60.0 && input.min_scarf < 0.5,
        protocols: &[DebiasProtocol::PreMortemMandatory],
    },
    ProtocolRule {
        name: "scarf-threat",
        applies: |input| input.min_scarf < 0.5,
        protocols: &[
            DebiasProtocol::PreMortemAdvisory,
            DebiasProtocol::ConsiderOpposite,
        ],
    },
    ProtocolRule {
        name: "multiple-limiting-factors",
        applies: |input| input.limiting_factor_count >= 2,
        protocols: &[
            DebiasProtocol::PreMortemAdvisory,
            DebiasProtocol::ConsiderOpposite,
        ],
    },
    ProtocolRule {
        name: "single-limiting-factor",
        applies: |input| input.limiting_factor_count == 1,
        protocols: &[DebiasProtocol::ConsiderOpposite],
    },
    ProtocolRule {
        name: "score-below-resilient",
        applies: |input| input.score < 70.0,
        protocols: &[DebiasProtocol::ConsiderOpposite],
    },
    ProtocolRule {
        name: "default-standard",
        applies: |_| true,
        protocols: &[DebiasProtocol::Standard],
    },
];

/// Walks the ordered table; returns the fired rule's name alongside the
/// required protocols.
pub fn select_protocols(input: &RuleInput) -> (&'static str, Vec<DebiasProtocol>) {
    for rule in PROTOCOL_RULES.iter() {
        if (rule.applies)(input) {
            return (rule.name, rule.protocols.to_vec());
        }
    }
    // The catch-all above makes this unreachable.
    ("default-standard", vec![DebiasProtocol::Standard])
}

/// The single risk-level function. Protocol selection and record assembly
/// both call this; any divergence between the two is a defect.
pub fn determine_risk_level(input: &RuleInput) -> RiskLevel {
    if input.score < 55.0 || (input.score < 60.0 && input.min_scarf < 0.5) {
        RiskLevel::Critical
    } else if input.scarf_threat_count >= 3 || input.score < 70.0 || input.min_scarf < 0.5 {
        RiskLevel::High
    } else if input.score < 85.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Risk level plus limiting-factor count decide the baseline outcome. A
/// Stochastic determinism tier overrides this downstream.
pub fn baseline_outcome(level: RiskLevel, limiting_factor_count: usize) -> DecisionOutcome {
    match level {
        RiskLevel::Critical => DecisionOutcome::AbortRecommended,
        RiskLevel::High if limiting_factor_count >= 2 => DecisionOutcome::DelayPendingReview,
        RiskLevel::High | RiskLevel::Medium => DecisionOutcome::ProceedWithControls,
        RiskLevel::Low => DecisionOutcome::Proceed,
    }
}
