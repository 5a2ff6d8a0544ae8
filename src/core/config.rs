//! Engine configuration loaded from `.debias/debias.toml`.
//!
//! The config names the external generation command (if any) and the
//! determinism-verification parameters. A missing config file is not an
//! error: scoring, bias detection, protocol selection, and the ledger all
//! work without a generator; pre-mortem content then comes from the fixed
//! fallback set.

use crate::core::error::DebiasError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "debias.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// External generation service, invoked as a subprocess.
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,
    /// Fixed seed passed to every generation call.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Determinism verification iterations.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_seed() -> u64 {
    42
}

fn default_iterations() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            generator: None,
            seed: default_seed(),
            iterations: default_iterations(),
        }
    }
}

/// Load engine config from `.debias/debias.toml`.
/// Accepts either the project root (parent of `.debias`) or the store root
/// (`.debias/data`), mirroring how stores are addressed elsewhere.
pub fn load_engine_config(dir: &Path) -> Result<EngineConfig, DebiasError> {
    let candidates = [
        dir.join(".debias").join(CONFIG_FILE_NAME),
        dir.parent()
            .map(|p| p.join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| dir.join(CONFIG_FILE_NAME)),
    ];

    for path in &candidates {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(DebiasError::IoError)?;
            let config: EngineConfig = toml::from_str(&content)
                .map_err(|e| DebiasError::ValidationError(e.to_string()))?;
            // Rejected here so a bad value surfaces before any analysis
            // starts, not mid-pipeline after a successful generation.
            if config.iterations == 0 {
                return Err(DebiasError::ValidationError(
                    "iterations must be at least 1".to_string(),
                ));
            }
            return Ok(config);
        }
    }

    // No config = no generator configured (not an error)
    Ok(EngineConfig::default())
}

/// Default config file content written by `debias init`.
pub fn default_config_toml() -> String {
    let mut out = String::new();
    out.push_str("# Debias engine configuration\n");
    out.push_str("#\n");
    out.push_str("# seed: fixed seed for all generation calls (determinism verification\n");
    out.push_str("# is meaningless without one). iterations: verification re-runs.\n");
    out.push_str("\nseed = 42\niterations = 3\n\n");
    out.push_str("# Uncomment to wire an external generation service. The command is\n");
    out.push_str("# invoked per call with a JSON request on stdin and must print a JSON\n");
    out.push_str("# response on stdout.\n");
    out.push_str("#\n");
    out.push_str("# [generator]\n");
    out.push_str("# command = \"debias-generator\"\n");
    out.push_str("# args = []\n");
    out.push_str("# timeout_secs = 30\n");
    out
}
