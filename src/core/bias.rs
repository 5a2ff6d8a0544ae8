//! Pattern-based cognitive-bias detector.
//!
//! A fixed table of eight bias signatures is matched against free text. The
//! matcher is purely lexical: it has no notion of semantics and will flag
//! "guarantee" in a quoted contract clause as readily as in an overconfident
//! claim. That precision/recall tradeoff is accepted; findings are advisory
//! inputs to protocol selection, never blocking judgments on their own.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasType {
    Anchoring,
    Overconfidence,
    StatusQuo,
    Confirmation,
    Availability,
    Groupthink,
    SunkCost,
    Framing,
}

impl fmt::Display for BiasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BiasType::Anchoring => "Anchoring",
            BiasType::Overconfidence => "Overconfidence",
            BiasType::StatusQuo => "StatusQuo",
            BiasType::Confirmation => "Confirmation",
            BiasType::Availability => "Availability",
            BiasType::Groupthink => "Groupthink",
            BiasType::SunkCost => "SunkCost",
            BiasType::Framing => "Framing",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasSeverity {
    Low,
    Medium,
    High,
}

impl fmt::Display for BiasSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BiasSeverity::Low => "Low",
            BiasSeverity::Medium => "Medium",
            BiasSeverity::High => "High",
        };
        write!(f, "{}", label)
    }
}

/// One finding per matched bias type, carrying up to three matched
/// substrings as evidence. Embedded in decision records; never persisted
/// standalone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasFinding {
    pub bias: BiasType,
    pub severity: BiasSeverity,
    pub description: String,
    pub mitigation: String,
    pub evidence: String,
}

struct BiasSignature {
    bias: BiasType,
    pattern: Regex,
    severity: BiasSeverity,
    description: &'static str,
    mitigation: &'static str,
}

const MAX_EVIDENCE_MATCHES: usize = 3;

static BIAS_SIGNATURES: LazyLock<Vec<BiasSignature>> = LazyLock::new(|| {
    let signature = |bias, pattern: &str, severity, description, mitigation| BiasSignature {
        bias,
        // Table patterns are static and known-good; a bad one is a bug in
        // this file, caught by the table self-test below.
        pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bias pattern: {}", e)),
        severity,
        description,
        mitigation,
    };

    vec![
        signature(
            BiasType::Anchoring,
            r"(?i)\$[\d,]+(?:\.\d+)?[kmb]?|\d+%|\d{2,}[kmb]\b",
            BiasSeverity::Medium,
            "Specific numerical figures detected - potential anchoring bias",
            "Consider the Opposite: What if this number were 50% different?",
        ),
        signature(
            BiasType::Overconfidence,
            r"(?i)\b(?:definitely|certainly|guaranteed?|impossible|always|never|100%|zero chance)\b",
            BiasSeverity::High,
            "Absolute language detected - potential overconfidence bias",
            "Pre-Mortem: Imagine this decision failed spectacularly. What went wrong?",
        ),
        signature(
            BiasType::StatusQuo,
            r"(?i)\b(?:current|existing|traditional|always done|usual|standard practice)\b",
            BiasSeverity::Low,
            "Status quo references detected - potential resistance to change",
            "Consider: What would a new competitor do without legacy constraints?",
        ),
        signature(
            BiasType::Confirmation,
            r"(?i)\b(?:clearly|obviously|everyone knows|proven fact|undeniable)\b",
            BiasSeverity::Medium,
            "Assumed certainty detected - potential confirmation bias",
            "Seek Disconfirming Evidence: What data would change your mind?",
        ),
        signature(
            BiasType::Availability,
            r"(?i)\b(?:just happened|recently|last (?:week|month|quarter)|heard about)\b",
            BiasSeverity::Low,
            "Recent/anecdotal references detected - potential availability bias",
            "Base Rate Check: What does the historical data show?",
        ),
        signature(
            BiasType::Groupthink,
            r"(?i)\b(?:everyone agrees|unanimous|no objections|whole team thinks)\b",
            BiasSeverity::High,
            "Unanimous consensus language detected - potential groupthink",
            "Devil's Advocate: Assign someone to argue the opposing position",
        ),
        signature(
            BiasType::SunkCost,
            r"(?i)\b(?:already invested|spent so much|too far to|can't stop now)\b",
            BiasSeverity::Medium,
            "Past investment justification detected - potential sunk cost fallacy",
            "Zero-Base Thinking: If starting fresh today, would you make this decision?",
        ),
        signature(
            BiasType::Framing,
            r"(?i)\b(?:opportunity|threat|gain|loss|risk|reward)\b",
            BiasSeverity::Low,
            "Framing language detected - consider alternative framings",
            "Reframe: How would this look as an opportunity vs. a threat?",
        ),
    ]
});

/// Scans text against the signature table. Deterministic, pure, and may
/// return an empty list; one finding per matched type, in table order.
pub fn detect(text: &str) -> Vec<BiasFinding> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut findings = Vec::new();
    for sig in BIAS_SIGNATURES.iter() {
        let matches: Vec<&str> = sig
            .pattern
            .find_iter(text)
            .take(MAX_EVIDENCE_MATCHES)
            .map(|m| m.as_str())
            .collect();
        if !matches.is_empty() {
            findings.push(BiasFinding {
                bias: sig.bias,
                severity: sig.severity,
                description: sig.description.to_string(),
                mitigation: sig.mitigation.to_string(),
                evidence: matches.join(", "),
            });
        }
    }
    findings
}

pub fn signature_count() -> usize {
    BIAS_SIGNATURES.len()
}
