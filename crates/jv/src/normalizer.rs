//! Converts in-memory schema/instance values that may carry native tagged data into
//! pure JSON form (SPEC_FULL.md §8, idempotent-normalization property).
//!
//! This crate's own schema and instance values are always `serde_json::Value` already,
//! so the default implementation is the identity function. The trait exists as the seam
//! an embedder feeds non-JSON-derived values (atoms used as enum labels, structs with
//! their own JSON form) through before they reach the `Resolver`/`Builder`.
use serde_json::{Map, Value};

/// Normalizes an arbitrary value into pure JSON: maps with string keys, arrays,
/// numbers, booleans, null and strings.
pub trait Normalizer {
    /// Called exactly once per unrecognized atom encountered during normalization.
    /// The default turns it into its `Display`-rendered string form.
    fn on_general_atom(&self, atom: &dyn std::fmt::Display) -> Value {
        Value::String(atom.to_string())
    }

    fn normalize(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k, self.normalize(v));
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.normalize(v)).collect())
            }
            other => other,
        }
    }
}

/// The identity normalizer: `serde_json::Value` is already pure JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityNormalizer;

impl Normalizer for IdentityNormalizer {}
