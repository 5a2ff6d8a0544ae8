//! Resilience scoring, zone classification, and limiting-factor analysis.

use debias::core::risk::{
    build_risk_flag, classify_zone, compute_score, identify_limiting_factors,
    identify_scarf_threats, validate_assessment, ComponentScores, LimitingFactor, ResilienceZone,
    ScarfProfile, TriggerCondition,
};

fn scores(environment: f64, capacity: f64, validation: f64, neural: f64) -> ComponentScores {
    ComponentScores {
        environment,
        adaptive_capacity: capacity,
        validation,
        neural_coefficient: neural,
    }
}

fn profile(status: f64, certainty: f64, autonomy: f64, relatedness: f64, fairness: f64) -> ScarfProfile {
    ScarfProfile {
        status,
        certainty,
        autonomy,
        relatedness,
        fairness,
    }
}

#[test]
fn composite_score_worked_example() {
    // 80*0.30 + (4.0/5*100)*0.30 + 75*0.40 = 78.0, scaled by 0.9.
    let s = scores(80.0, 4.0, 75.0, 0.9);
    let score = compute_score(&s);
    assert!((score - 70.2).abs() < 1e-9, "got {}", score);
    assert_eq!(classify_zone(score), ResilienceZone::Resilient);
}

#[test]
fn score_is_monotone_in_each_component() {
    let base = scores(60.0, 3.0, 60.0, 0.9);
    let base_score = compute_score(&base);
    assert!(compute_score(&scores(70.0, 3.0, 60.0, 0.9)) > base_score);
    assert!(compute_score(&scores(60.0, 4.0, 60.0, 0.9)) > base_score);
    assert!(compute_score(&scores(60.0, 3.0, 70.0, 0.9)) > base_score);
    assert!(compute_score(&scores(60.0, 3.0, 60.0, 1.0)) > base_score);
}

#[test]
fn scoring_is_idempotent() {
    let s = scores(35.0, 2.0, 40.0, 0.7);
    let p = profile(0.3, 0.4, 0.6, 0.2, 0.8);
    assert_eq!(compute_score(&s), compute_score(&s));
    assert_eq!(identify_limiting_factors(&s), identify_limiting_factors(&s));
    assert_eq!(identify_scarf_threats(&p), identify_scarf_threats(&p));
}

#[test]
fn zone_bands_are_inclusive_on_lower_bound() {
    assert_eq!(classify_zone(85.0), ResilienceZone::Expansion);
    assert_eq!(classify_zone(84.99), ResilienceZone::Resilient);
    assert_eq!(classify_zone(70.0), ResilienceZone::Resilient);
    assert_eq!(classify_zone(69.99), ResilienceZone::Strained);
    assert_eq!(classify_zone(55.0), ResilienceZone::Strained);
    assert_eq!(classify_zone(54.99), ResilienceZone::Critical);
}

#[test]
fn all_three_limiting_factors_can_fire_together() {
    let factors = identify_limiting_factors(&scores(35.0, 2.0, 40.0, 0.7));
    assert_eq!(
        factors,
        vec![
            LimitingFactor::EnvironmentCap,
            LimitingFactor::ValidationVeto,
            LimitingFactor::NeuralBrake,
        ]
    );
}

#[test]
fn limiting_factor_thresholds_are_exclusive() {
    // Exactly at threshold no factor fires.
    let factors = identify_limiting_factors(&scores(40.0, 3.0, 50.0, 1.0));
    assert!(factors.is_empty());
}

#[test]
fn scarf_threats_preserve_dimension_order() {
    let threats = identify_scarf_threats(&profile(0.4, 0.3, 0.7, 0.45, 0.7));
    assert_eq!(threats, vec!["status", "certainty", "relatedness"]);
}

#[test]
fn scarf_threshold_is_strict() {
    assert!(identify_scarf_threats(&profile(0.5, 0.5, 0.5, 0.5, 0.5)).is_empty());
}

#[test]
fn validation_rejects_out_of_range_and_non_finite() {
    let healthy = profile(0.7, 0.7, 0.7, 0.7, 0.7);
    assert!(validate_assessment(&scores(100.1, 3.0, 50.0, 0.9), &healthy).is_err());
    assert!(validate_assessment(&scores(80.0, 5.1, 50.0, 0.9), &healthy).is_err());
    assert!(validate_assessment(&scores(80.0, 3.0, -0.1, 0.9), &healthy).is_err());
    assert!(validate_assessment(&scores(80.0, 3.0, 50.0, f64::NAN), &healthy).is_err());
    assert!(validate_assessment(&scores(80.0, 3.0, 50.0, 0.9), &profile(0.7, 1.2, 0.7, 0.7, 0.7)).is_err());
    assert!(validate_assessment(&scores(80.0, 3.0, 50.0, 0.9), &healthy).is_ok());
}

#[test]
fn flag_raised_by_scarf_threat_alone() {
    // Healthy component scores; only the certainty dimension is threatened.
    let flag = build_risk_flag(
        scores(85.0, 4.5, 90.0, 1.0),
        profile(0.8, 0.3, 0.8, 0.8, 0.8),
    );
    assert!(flag.risk_active);
    assert_eq!(flag.primary_driver, "SCARF_CERTAINTY_THREAT");
    assert_eq!(
        flag.trigger_conditions,
        vec![TriggerCondition::ScarfCertaintyThreat]
    );
}

#[test]
fn critical_zone_leads_the_trigger_list() {
    let flag = build_risk_flag(
        scores(35.0, 1.5, 40.0, 0.8),
        profile(0.7, 0.7, 0.7, 0.7, 0.7),
    );
    assert!(flag.risk_active);
    assert_eq!(flag.zone, ResilienceZone::Critical);
    assert_eq!(flag.trigger_conditions[0], TriggerCondition::CriticalZone);
    assert_eq!(flag.primary_driver, "CRITICAL_ZONE");
}

#[test]
fn quiet_inputs_raise_no_flag() {
    let flag = build_risk_flag(
        scores(90.0, 4.5, 90.0, 1.0),
        profile(0.8, 0.8, 0.8, 0.8, 0.8),
    );
    assert!(!flag.risk_active);
    assert!(flag.primary_driver.is_empty());
    assert_eq!(flag.zone, ResilienceZone::Expansion);
}
