//! Determinism-tier verification for externally generated content.
//!
//! The generation step is re-run with the same seed and input; each output is
//! content-hashed and the spread of hashes classifies reproducibility. A
//! Stochastic classification never blocks the decision - it downgrades the
//! recommended outcome to delay-pending-review and is always surfaced in the
//! report.

use crate::core::error::DebiasError;
use crate::core::generation::{GenerationRequest, GenerationService};
use crate::core::hash;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const CONSTRAINED_CONSISTENCY_THRESHOLD: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeterminismTier {
    Deterministic,
    Constrained,
    Stochastic,
}

impl fmt::Display for DeterminismTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeterminismTier::Deterministic => "DETERMINISTIC",
            DeterminismTier::Constrained => "CONSTRAINED",
            DeterminismTier::Stochastic => "STOCHASTIC",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterminismReport {
    pub verification_id: String,
    pub iterations: u32,
    pub seed: u64,
    pub unique_hash_count: usize,
    pub consistency_rate: f64,
    pub tier: DeterminismTier,
    pub iteration_hashes: Vec<String>,
}

impl DeterminismReport {
    pub fn is_fully_deterministic(&self) -> bool {
        self.tier == DeterminismTier::Deterministic
    }
}

/// Re-runs `request` against the service `iterations` times and classifies
/// output stability. An iteration that errors contributes no hash, so
/// repeated failures degrade the tier rather than aborting the decision.
pub fn verify(
    service: &dyn GenerationService,
    request: &GenerationRequest,
    iterations: u32,
) -> Result<DeterminismReport, DebiasError> {
    if iterations == 0 {
        return Err(DebiasError::ValidationError(
            "determinism verification requires at least one iteration".to_string(),
        ));
    }

    let mut hashes = Vec::new();
    for _ in 0..iterations {
        if let Ok(output) = service.generate(request) {
            hashes.push(hash::content_hash(&output)?);
        }
    }

    let (unique_hash_count, consistency_rate) = classify_counts(&hashes, iterations);
    let tier = classify_tier(unique_hash_count, consistency_rate, hashes.len(), iterations);

    Ok(DeterminismReport {
        verification_id: time::new_event_id(),
        iterations,
        seed: request.seed,
        unique_hash_count,
        consistency_rate,
        tier,
        iteration_hashes: hashes,
    })
}

fn classify_counts(hashes: &[String], iterations: u32) -> (usize, f64) {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for h in hashes {
        *counts.entry(h.as_str()).or_insert(0) += 1;
    }
    let top = counts.values().copied().max().unwrap_or(0);
    (counts.len(), f64::from(top) / f64::from(iterations))
}

fn classify_tier(
    unique_hash_count: usize,
    consistency_rate: f64,
    completed: usize,
    iterations: u32,
) -> DeterminismTier {
    if unique_hash_count == 1 && completed == iterations as usize {
        DeterminismTier::Deterministic
    } else if consistency_rate >= CONSTRAINED_CONSISTENCY_THRESHOLD {
        DeterminismTier::Constrained
    } else {
        DeterminismTier::Stochastic
    }
}
