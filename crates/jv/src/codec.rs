//! JSON encoding/decoding as a swappable collaborator (SPEC_FULL.md §4.5).
//!
//! The core only ever needs to turn bytes into a [`serde_json::Value`] and back; which
//! concrete encoder does that is deliberately not this crate's concern; [`NativeCodec`]
//! is the default, built on `serde_json` (already pulled in workspace-wide).
use serde_json::Value;

pub trait Codec: Send + Sync {
    /// # Errors
    /// Returns an error message if `bytes` is not valid JSON for this codec.
    fn decode(&self, bytes: &[u8]) -> Result<Value, String>;

    /// # Errors
    /// Returns an error message if `value` cannot be serialized.
    fn encode_to_iodata(&self, value: &Value) -> Result<Vec<u8>, String>;

    /// Pretty-printed encoding.
    ///
    /// # Errors
    /// Returns an error message if `value` cannot be serialized.
    fn format_to_iodata(&self, value: &Value) -> Result<Vec<u8>, String>;

    /// Re-encode with object keys sorted, for deterministic output comparisons.
    #[must_use]
    fn to_ordered_data(&self, value: &Value) -> Value {
        order(value)
    }
}

fn order(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut ordered = serde_json::Map::with_capacity(entries.len());
            for (k, v) in entries {
                ordered.insert(k.clone(), order(v));
            }
            Value::Object(ordered)
        }
        Value::Array(items) => Value::Array(items.iter().map(order).collect()),
        other => other.clone(),
    }
}

/// `serde_json`-backed default codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeCodec;

impl Codec for NativeCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Value, String> {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    }

    fn encode_to_iodata(&self, value: &Value) -> Result<Vec<u8>, String> {
        serde_json::to_vec(value).map_err(|e| e.to_string())
    }

    fn format_to_iodata(&self, value: &Value) -> Result<Vec<u8>, String> {
        serde_json::to_vec_pretty(value).map_err(|e| e.to_string())
    }
}
