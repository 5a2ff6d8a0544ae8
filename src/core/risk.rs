//! Human-factor risk sensor: composite resilience scoring, limiting-factor
//! analysis, and risk-flag assembly.
//!
//! The scoring formula is fixed policy, not configuration: environment and
//! normalized adaptive capacity each weigh 0.30, validation weighs 0.40, and
//! the weighted sum is scaled by the neural coefficient. All functions here
//! are pure; range clamping is the caller's contract (`validate_assessment`
//! rejects out-of-range input before anything is scored).

use crate::core::error::DebiasError;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable input snapshot, created once per assessment event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComponentScores {
    /// Environment sub-score, 0-100
    pub environment: f64,
    /// Adaptive capacity, 0-5
    pub adaptive_capacity: f64,
    /// Validation sub-score, 0-100
    pub validation: f64,
    /// Neural coefficient, 0-1
    pub neural_coefficient: f64,
}

/// Five-dimension threat/reward profile, each dimension in [0,1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScarfProfile {
    pub status: f64,
    pub certainty: f64,
    pub autonomy: f64,
    pub relatedness: f64,
    pub fairness: f64,
}

impl ScarfProfile {
    pub fn dimensions(&self) -> [(&'static str, f64); 5] {
        [
            ("status", self.status),
            ("certainty", self.certainty),
            ("autonomy", self.autonomy),
            ("relatedness", self.relatedness),
            ("fairness", self.fairness),
        ]
    }

    pub fn min_dimension(&self) -> f64 {
        self.dimensions()
            .iter()
            .map(|(_, v)| *v)
            .fold(f64::INFINITY, f64::min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResilienceZone {
    Expansion,
    Resilient,
    Strained,
    Critical,
}

impl fmt::Display for ResilienceZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResilienceZone::Expansion => "EXPANSION",
            ResilienceZone::Resilient => "RESILIENT",
            ResilienceZone::Strained => "STRAINED",
            ResilienceZone::Critical => "CRITICAL",
        };
        write!(f, "{}", label)
    }
}

/// A sub-score capping the composite. Derived, never stored independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitingFactor {
    EnvironmentCap,
    ValidationVeto,
    NeuralBrake,
}

impl fmt::Display for LimitingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LimitingFactor::EnvironmentCap => "ENVIRONMENT_CAP",
            LimitingFactor::ValidationVeto => "VALIDATION_VETO",
            LimitingFactor::NeuralBrake => "NEURAL_BRAKE",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerCondition {
    CriticalZone,
    EnvironmentConstraint,
    ConstrainedCapacity,
    SayDoGap,
    ScarfStatusThreat,
    ScarfCertaintyThreat,
    ScarfAutonomyThreat,
    ScarfRelatednessThreat,
    ScarfFairnessThreat,
}

impl fmt::Display for TriggerCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TriggerCondition::CriticalZone => "CRITICAL_ZONE",
            TriggerCondition::EnvironmentConstraint => "ENVIRONMENT_CONSTRAINT",
            TriggerCondition::ConstrainedCapacity => "CONSTRAINED_CAPACITY",
            TriggerCondition::SayDoGap => "SAY_DO_GAP",
            TriggerCondition::ScarfStatusThreat => "SCARF_STATUS_THREAT",
            TriggerCondition::ScarfCertaintyThreat => "SCARF_CERTAINTY_THREAT",
            TriggerCondition::ScarfAutonomyThreat => "SCARF_AUTONOMY_THREAT",
            TriggerCondition::ScarfRelatednessThreat => "SCARF_RELATEDNESS_THREAT",
            TriggerCondition::ScarfFairnessThreat => "SCARF_FAIRNESS_THREAT",
        };
        write!(f, "{}", label)
    }
}

/// The risk-sensor output consumed read-only by the decision engine.
/// Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFlag {
    pub risk_active: bool,
    pub primary_driver: String,
    pub score: f64,
    pub zone: ResilienceZone,
    pub component_scores: ComponentScores,
    pub scarf_profile: ScarfProfile,
    pub trigger_conditions: Vec<TriggerCondition>,
    pub created_at: String,
}

/// Composite resilience score in [0,100] for in-range inputs.
pub fn compute_score(scores: &ComponentScores) -> f64 {
    let normalized_capacity = scores.adaptive_capacity / 5.0 * 100.0;
    let raw = scores.environment * 0.30 + normalized_capacity * 0.30 + scores.validation * 0.40;
    raw * scores.neural_coefficient
}

/// Zone bands are inclusive on their lower bound.
pub fn classify_zone(score: f64) -> ResilienceZone {
    if score >= 85.0 {
        ResilienceZone::Expansion
    } else if score >= 70.0 {
        ResilienceZone::Resilient
    } else if score >= 55.0 {
        ResilienceZone::Strained
    } else {
        ResilienceZone::Critical
    }
}

/// All three rules are independent and always evaluated; zero to three
/// factors may be active at once.
pub fn identify_limiting_factors(scores: &ComponentScores) -> Vec<LimitingFactor> {
    let mut factors = Vec::new();
    if scores.environment < 40.0 {
        factors.push(LimitingFactor::EnvironmentCap);
    }
    if scores.validation < 50.0 {
        factors.push(LimitingFactor::ValidationVeto);
    }
    if scores.neural_coefficient < 1.0 {
        factors.push(LimitingFactor::NeuralBrake);
    }
    factors
}

/// Any dimension below 0.5 is a threat domain.
pub fn identify_scarf_threats(profile: &ScarfProfile) -> Vec<String> {
    profile
        .dimensions()
        .iter()
        .filter(|(_, value)| *value < 0.5)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Rejects out-of-range assessment inputs before any scoring runs.
pub fn validate_assessment(
    scores: &ComponentScores,
    profile: &ScarfProfile,
) -> Result<(), DebiasError> {
    let in_range = |value: f64, lo: f64, hi: f64| value.is_finite() && value >= lo && value <= hi;

    if !in_range(scores.environment, 0.0, 100.0) {
        return Err(DebiasError::ValidationError(format!(
            "environment score {} out of range 0-100",
            scores.environment
        )));
    }
    if !in_range(scores.adaptive_capacity, 0.0, 5.0) {
        return Err(DebiasError::ValidationError(format!(
            "adaptive capacity {} out of range 0-5",
            scores.adaptive_capacity
        )));
    }
    if !in_range(scores.validation, 0.0, 100.0) {
        return Err(DebiasError::ValidationError(format!(
            "validation score {} out of range 0-100",
            scores.validation
        )));
    }
    if !in_range(scores.neural_coefficient, 0.0, 1.0) {
        return Err(DebiasError::ValidationError(format!(
            "neural coefficient {} out of range 0-1",
            scores.neural_coefficient
        )));
    }
    for (name, value) in profile.dimensions() {
        if !in_range(value, 0.0, 1.0) {
            return Err(DebiasError::ValidationError(format!(
                "scarf dimension '{}' {} out of range 0-1",
                name, value
            )));
        }
    }
    Ok(())
}

fn trigger_conditions(
    scores: &ComponentScores,
    profile: &ScarfProfile,
    zone: ResilienceZone,
) -> Vec<TriggerCondition> {
    let mut conditions = Vec::new();
    if zone == ResilienceZone::Critical {
        conditions.push(TriggerCondition::CriticalZone);
    }
    if scores.environment < 40.0 {
        conditions.push(TriggerCondition::EnvironmentConstraint);
    }
    if scores.adaptive_capacity < 2.5 {
        conditions.push(TriggerCondition::ConstrainedCapacity);
    }
    if scores.validation < 50.0 {
        conditions.push(TriggerCondition::SayDoGap);
    }
    if profile.status < 0.5 {
        conditions.push(TriggerCondition::ScarfStatusThreat);
    }
    if profile.certainty < 0.5 {
        conditions.push(TriggerCondition::ScarfCertaintyThreat);
    }
    if profile.autonomy < 0.5 {
        conditions.push(TriggerCondition::ScarfAutonomyThreat);
    }
    if profile.relatedness < 0.5 {
        conditions.push(TriggerCondition::ScarfRelatednessThreat);
    }
    if profile.fairness < 0.5 {
        conditions.push(TriggerCondition::ScarfFairnessThreat);
    }
    conditions
}

/// Builds the immutable risk-flag snapshot from validated inputs.
///
/// `risk_active` is raised when the zone is Critical or any trigger condition
/// fires; the first-listed active condition is named the primary driver.
pub fn build_risk_flag(scores: ComponentScores, profile: ScarfProfile) -> RiskFlag {
    let score = compute_score(&scores);
    let zone = classify_zone(score);
    let conditions = trigger_conditions(&scores, &profile, zone);
    let primary_driver = conditions
        .first()
        .map(|c| c.to_string())
        .unwrap_or_default();

    RiskFlag {
        risk_active: !conditions.is_empty(),
        primary_driver,
        score,
        zone,
        component_scores: scores,
        scarf_profile: profile,
        trigger_conditions: conditions,
        created_at: time::now_epoch_z(),
    }
}
