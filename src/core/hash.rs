//! Canonical serialization and content hashing.
//!
//! Every hash in Debias (ledger chain links, decision input/output hashes,
//! determinism content hashes) is SHA-256 over the canonical JSON form of the
//! value: object keys sorted lexicographically, no insignificant whitespace.
//! Canonical form is what makes "same content, same hash" hold regardless of
//! struct field order or map iteration order.

use crate::core::error::DebiasError;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Renders a JSON value in canonical form: sorted object keys, compact.
pub fn canonical_json(value: &JsonValue) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// SHA-256 hex digest of a serializable value's canonical JSON form.
pub fn content_hash<T: Serialize>(value: &T) -> Result<String, DebiasError> {
    let json = serde_json::to_value(value)
        .map_err(|e| DebiasError::ValidationError(format!("unhashable value: {}", e)))?;
    Ok(sha256_hex(&canonical_json(&json)))
}

fn write_canonical(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Null => out.push_str("null"),
        JsonValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        JsonValue::Number(n) => out.push_str(&n.to_string()),
        JsonValue::String(s) => write_escaped(s, out),
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped(key, out);
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

fn write_escaped(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
