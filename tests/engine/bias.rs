//! Bias-language detection over the fixed signature table.

use debias::core::bias::{detect, signature_count, BiasSeverity, BiasType};

#[test]
fn table_carries_eight_signatures() {
    assert_eq!(signature_count(), 8);
}

#[test]
fn overconfidence_is_high_severity_with_evidence() {
    let findings = detect("This launch will definitely succeed, guaranteed.");
    let finding = findings
        .iter()
        .find(|f| f.bias == BiasType::Overconfidence)
        .expect("overconfidence finding");
    assert_eq!(finding.severity, BiasSeverity::High);
    assert_eq!(finding.evidence, "definitely, guaranteed");
    assert!(finding.mitigation.contains("Pre-Mortem"));
}

#[test]
fn clean_text_yields_no_findings() {
    let findings = detect("We reviewed the quarterly plan and agreed on next steps.");
    assert!(findings.is_empty(), "unexpected: {:?}", findings);
}

#[test]
fn detection_is_idempotent() {
    let text = "This will definitely succeed and is guaranteed to work.";
    let first = detect(text);
    let second = detect(text);
    assert_eq!(first.len(), second.len());
    assert!(first
        .iter()
        .zip(&second)
        .all(|(a, b)| a.bias == b.bias && a.evidence == b.evidence));
}

#[test]
fn evidence_is_capped_at_three_matches() {
    let findings = detect("It is always right, never wrong, certainly true, definitely so, impossible to fail.");
    let finding = findings
        .iter()
        .find(|f| f.bias == BiasType::Overconfidence)
        .expect("overconfidence finding");
    assert_eq!(finding.evidence.split(", ").count(), 3);
    assert_eq!(finding.evidence, "always, never, certainly");
}

#[test]
fn findings_follow_table_order() {
    // Triggers overconfidence (cross-signature) and anchoring ($2M); anchoring
    // sits first in the table regardless of match position in the text.
    let findings = detect("We will certainly recover the $2,000,000 investment.");
    let types: Vec<BiasType> = findings.iter().map(|f| f.bias).collect();
    let anchoring_pos = types.iter().position(|t| *t == BiasType::Anchoring);
    let overconfidence_pos = types.iter().position(|t| *t == BiasType::Overconfidence);
    assert!(anchoring_pos.expect("anchoring") < overconfidence_pos.expect("overconfidence"));
}

#[test]
fn one_finding_per_type_even_with_many_matches() {
    let findings = detect("Everyone agrees; the whole team thinks it's unanimous.");
    let groupthink: Vec<_> = findings
        .iter()
        .filter(|f| f.bias == BiasType::Groupthink)
        .collect();
    assert_eq!(groupthink.len(), 1);
}

#[test]
fn word_boundaries_prevent_substring_matches() {
    // "cleverness" contains "never"; "grain" contains "gain".
    let findings = detect("Their cleverness ground the grain.");
    assert!(findings.is_empty(), "unexpected: {:?}", findings);
}

#[test]
fn sunk_cost_phrases_are_detected() {
    let findings = detect("We've already invested too much; we can't stop now.");
    let finding = findings
        .iter()
        .find(|f| f.bias == BiasType::SunkCost)
        .expect("sunk cost finding");
    assert_eq!(finding.severity, BiasSeverity::Medium);
}
