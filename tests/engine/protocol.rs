//! Ordered protocol decision table, unified risk level, and baseline outcome.

use debias::core::protocol::{
    baseline_outcome, determine_risk_level, select_protocols, DebiasProtocol, DecisionOutcome,
    RiskLevel, RuleInput,
};

fn quiet() -> RuleInput {
    RuleInput {
        risk_active: false,
        score: 90.0,
        min_scarf: 0.8,
        scarf_threat_count: 0,
        limiting_factor_count: 0,
    }
}

#[test]
fn active_flag_short_circuits_everything() {
    // Even with an otherwise perfect profile, rule 1 wins.
    let input = RuleInput {
        risk_active: true,
        ..quiet()
    };
    let (name, protocols) = select_protocols(&input);
    assert_eq!(name, "risk-flag-active");
    assert_eq!(protocols, vec![DebiasProtocol::PreMortemMandatory]);
}

#[test]
fn critical_score_mandates_pre_mortem() {
    let input = RuleInput {
        score: 54.9,
        ..quiet()
    };
    let (name, protocols) = select_protocols(&input);
    assert_eq!(name, "score-critical");
    assert_eq!(protocols, vec![DebiasProtocol::PreMortemMandatory]);
}

#[test]
fn low_score_with_scarf_threat_outranks_plain_scarf_rule() {
    let input = RuleInput {
        score: 58.0,
        min_scarf: 0.4,
        scarf_threat_count: 1,
        ..quiet()
    };
    let (name, _) = select_protocols(&input);
    assert_eq!(name, "score-low-with-scarf-threat");
}

#[test]
fn scarf_threat_pairs_advisory_with_consider_opposite() {
    let input = RuleInput {
        min_scarf: 0.4,
        scarf_threat_count: 1,
        ..quiet()
    };
    let (name, protocols) = select_protocols(&input);
    assert_eq!(name, "scarf-threat");
    assert_eq!(
        protocols,
        vec![
            DebiasProtocol::PreMortemAdvisory,
            DebiasProtocol::ConsiderOpposite,
        ]
    );
}

#[test]
fn limiting_factor_rules_split_on_count() {
    let two = RuleInput {
        limiting_factor_count: 2,
        ..quiet()
    };
    assert_eq!(select_protocols(&two).0, "multiple-limiting-factors");

    let one = RuleInput {
        limiting_factor_count: 1,
        ..quiet()
    };
    let (name, protocols) = select_protocols(&one);
    assert_eq!(name, "single-limiting-factor");
    assert_eq!(protocols, vec![DebiasProtocol::ConsiderOpposite]);
}

#[test]
fn below_resilient_score_gets_consider_opposite() {
    let input = RuleInput {
        score: 69.9,
        ..quiet()
    };
    assert_eq!(select_protocols(&input).0, "score-below-resilient");
}

#[test]
fn quiet_input_falls_through_to_standard() {
    let (name, protocols) = select_protocols(&quiet());
    assert_eq!(name, "default-standard");
    assert_eq!(protocols, vec![DebiasProtocol::Standard]);
}

#[test]
fn risk_level_bands() {
    assert_eq!(
        determine_risk_level(&RuleInput { score: 54.9, ..quiet() }),
        RiskLevel::Critical
    );
    // Low score alone is only High; pairing it with a threatened dimension
    // below 60 escalates to Critical.
    assert_eq!(
        determine_risk_level(&RuleInput { score: 59.0, ..quiet() }),
        RiskLevel::High
    );
    assert_eq!(
        determine_risk_level(&RuleInput {
            score: 59.0,
            min_scarf: 0.4,
            ..quiet()
        }),
        RiskLevel::Critical
    );
    assert_eq!(
        determine_risk_level(&RuleInput { score: 69.9, ..quiet() }),
        RiskLevel::High
    );
    assert_eq!(
        determine_risk_level(&RuleInput { score: 84.9, ..quiet() }),
        RiskLevel::Medium
    );
    assert_eq!(determine_risk_level(&quiet()), RiskLevel::Low);
}

#[test]
fn three_scarf_threats_escalate_a_high_score() {
    let input = RuleInput {
        scarf_threat_count: 3,
        min_scarf: 0.4,
        ..quiet()
    };
    assert_eq!(determine_risk_level(&input), RiskLevel::High);
}

#[test]
fn outcome_matrix() {
    assert_eq!(
        baseline_outcome(RiskLevel::Critical, 0),
        DecisionOutcome::AbortRecommended
    );
    assert_eq!(
        baseline_outcome(RiskLevel::High, 2),
        DecisionOutcome::DelayPendingReview
    );
    assert_eq!(
        baseline_outcome(RiskLevel::High, 1),
        DecisionOutcome::ProceedWithControls
    );
    assert_eq!(
        baseline_outcome(RiskLevel::Medium, 3),
        DecisionOutcome::ProceedWithControls
    );
    assert_eq!(baseline_outcome(RiskLevel::Low, 0), DecisionOutcome::Proceed);
}
