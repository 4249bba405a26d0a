//! The internal cast vocabulary (SPEC_FULL.md §4.2 step 1, §4.6): not addressed by
//! any vocabulary URI, runs unconditionally when casting is enabled, and its one
//! output is lifted directly into `Subschema.cast` by the builder rather than
//! living in the validators list alongside the other modules.
use serde_json::{Map, Value};

use crate::{cast::CastDescriptor, format::FormatRegistry};

/// Register a format cast iff `raw` declares a `format` the registry recognizes.
#[must_use]
pub fn compile(raw: &Map<String, Value>, formats: &FormatRegistry) -> Option<CastDescriptor> {
    let format = raw.get("format").and_then(Value::as_str)?;
    if formats.is_known(format) {
        Some(CastDescriptor::Format(format.to_string()))
    } else {
        None
    }
}
