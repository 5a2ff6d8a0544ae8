//! Boundary to the external generation service.
//!
//! The service is an opaque collaborator: `generate(prompt, schema, seed,
//! temperature) -> JSON | error`. Debias consumes it the same way proofs are
//! consumed elsewhere in the control plane - as a subprocess. The configured
//! command receives the request as JSON on stdin and must print a JSON
//! response on stdout before the timeout.
//!
//! Pre-mortem and contrarian flows always pass `temperature = 0` and a fixed
//! seed; determinism verification is meaningless otherwise.

use crate::core::error::DebiasError;
use crate::core::config::GeneratorConfig;
use crate::core::risk::{LimitingFactor, RiskFlag};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub schema: JsonValue,
    pub seed: u64,
    pub temperature: f64,
}

pub trait GenerationService {
    fn generate(&self, request: &GenerationRequest) -> Result<JsonValue, DebiasError>;
}

/// Subprocess-backed generation client.
pub struct CommandGenerator {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandGenerator {
    pub fn new(config: &GeneratorConfig) -> Self {
        CommandGenerator {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl GenerationService for CommandGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<JsonValue, DebiasError> {
        let payload = serde_json::to_string(request)
            .map_err(|e| DebiasError::GenerationError(format!("request encode: {}", e)))?;

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                DebiasError::GenerationError(format!("spawn '{}' failed: {}", self.command, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload.as_bytes())
                .map_err(|e| DebiasError::GenerationError(format!("stdin write: {}", e)))?;
        }

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| DebiasError::GenerationError("stdout not captured".to_string()))?;
        let reader = std::thread::spawn(move || {
            let mut buf = String::new();
            stdout.read_to_string(&mut buf).map(|_| buf)
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(DebiasError::GenerationError(format!(
                            "'{}' timed out after {:?}",
                            self.command, self.timeout
                        )));
                    }
                    std::thread::sleep(Duration::from_millis(25));
                }
                Err(e) => {
                    return Err(DebiasError::GenerationError(format!("wait failed: {}", e)));
                }
            }
        };

        if !status.success() {
            return Err(DebiasError::GenerationError(format!(
                "'{}' exited with {}",
                self.command,
                status.code().unwrap_or(-1)
            )));
        }

        let output = reader
            .join()
            .map_err(|_| DebiasError::GenerationError("stdout reader panicked".to_string()))?
            .map_err(|e| DebiasError::GenerationError(format!("stdout read: {}", e)))?;

        serde_json::from_str(&output)
            .map_err(|e| DebiasError::GenerationError(format!("malformed response JSON: {}", e)))
    }
}

/// Placeholder client used when no generator is configured. Every call fails,
/// which routes the orchestrator onto the fallback path.
pub struct UnconfiguredGenerator;

impl GenerationService for UnconfiguredGenerator {
    fn generate(&self, _request: &GenerationRequest) -> Result<JsonValue, DebiasError> {
        Err(DebiasError::GenerationError(
            "no generator configured in debias.toml".to_string(),
        ))
    }
}

// --- Request builders ---

pub fn pre_mortem_request(
    decision_text: &str,
    known_risks: &[String],
    flag: &RiskFlag,
    limiting_factors: &[LimitingFactor],
    scarf_threats: &[String],
    detected_biases: &[String],
    seed: u64,
) -> GenerationRequest {
    let risks = if known_risks.is_empty() {
        "None specified".to_string()
    } else {
        known_risks.join(", ")
    };
    let scarf_line = if scarf_threats.is_empty() {
        "No active SCARF threats".to_string()
    } else {
        format!("Active SCARF threats: {}", scarf_threats.join(", "))
    };
    let limiting_line = if limiting_factors.is_empty() {
        "No limiting factors active".to_string()
    } else {
        format!(
            "Active limiting factors: {}",
            limiting_factors
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    let biases_line = if detected_biases.is_empty() {
        "None detected".to_string()
    } else {
        detected_biases.join(", ")
    };

    let prompt = format!(
        "You are a decision-science analyst performing a pre-mortem.\n\n\
         ## Context\n\
         Decision: {}\n\
         Known risks: {}\n\
         Resilience score: {:.1} (zone: {})\n\
         {}\n\
         {}\n\
         Detected cognitive biases: {}\n\n\
         ## Task\n\
         Assume this decision was implemented and failed badly 12 months from now.\n\
         Produce exactly 3 failure scenarios explaining what went wrong. For each:\n\
         title (max 50 chars), probability (decimal, all three summing to ~1.0),\n\
         description (100-200 words), mitigation_strategy (specific actions),\n\
         risk_category (one of OPERATIONAL, FINANCIAL, REPUTATIONAL, REGULATORY,\n\
         STRATEGIC).\n\n\
         Respond only with valid JSON matching the schema. No preamble.",
        decision_text, risks, flag.score, flag.zone, scarf_line, limiting_line, biases_line
    );

    GenerationRequest {
        prompt,
        schema: pre_mortem_schema(),
        seed,
        temperature: 0.0,
    }
}

pub fn contrarian_request(
    prior_conclusion: &str,
    supporting_evidence: &[String],
    detected_biases: &[String],
    seed: u64,
) -> GenerationRequest {
    let evidence = if supporting_evidence.is_empty() {
        "None provided".to_string()
    } else {
        supporting_evidence.join(", ")
    };
    let biases_line = if detected_biases.is_empty() {
        "None detected".to_string()
    } else {
        detected_biases.join(", ")
    };

    let prompt = format!(
        "You are a decision-science analyst performing consider-the-opposite analysis.\n\n\
         ## Context\n\
         Initial conclusion: {}\n\
         Supporting evidence: {}\n\
         Detected biases: {}\n\n\
         ## Task\n\
         Argue the case AGAINST the conclusion. Provide: counter_arguments (3 strong\n\
         arguments), alternative_hypothesis, disconfirming_evidence (what data would\n\
         disprove the conclusion), recommended_action (one of PROCEED, MODIFY,\n\
         RECONSIDER).\n\n\
         Respond only with valid JSON matching the schema. No preamble.",
        prior_conclusion, evidence, biases_line
    );

    GenerationRequest {
        prompt,
        schema: contrarian_schema(),
        seed,
        temperature: 0.0,
    }
}

fn pre_mortem_schema() -> JsonValue {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "probability": { "type": "number" },
                "description": { "type": "string" },
                "mitigation_strategy": { "type": "string" },
                "risk_category": { "type": "string" }
            },
            "required": [
                "title", "probability", "description",
                "mitigation_strategy", "risk_category"
            ]
        }
    })
}

fn contrarian_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "counter_arguments": { "type": "array", "items": { "type": "string" } },
            "alternative_hypothesis": { "type": "string" },
            "disconfirming_evidence": { "type": "string" },
            "recommended_action": { "type": "string" }
        },
        "required": [
            "counter_arguments", "alternative_hypothesis",
            "disconfirming_evidence", "recommended_action"
        ]
    })
}
