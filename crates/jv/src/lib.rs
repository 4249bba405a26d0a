//! A JSON Schema validation engine supporting the 2020-12 and Draft 7 dialects.
//!
//! - 🔧 Pluggable vocabularies, formats, resolver backends and a deferred cast
//!   side-channel
//! - 🌐 Remote reference fetching (network/file), off by default
//! - 📐 `Ascending`/`Descending` grouped error output matching a stable JSON shape
//!
//! # Validation
//!
//! For a single check, use [`is_valid`]:
//!
//! ```rust
//! use serde_json::json;
//!
//! let schema = json!({"type": "string"});
//! assert!(jv::is_valid(&schema, &json!("hello")));
//! ```
//!
//! For repeated validation against the same schema, compile once and reuse the
//! [`Validator`]:
//!
//! ```rust
//! use serde_json::json;
//!
//! let validator = jv::compile(&json!({"type": "string", "minLength": 1}))
//!     .expect("valid schema");
//!
//! assert!(validator.is_valid(&json!("hi")));
//! assert!(!validator.is_valid(&json!("")));
//!
//! let output = validator.validate(&json!(42));
//! assert!(!output.valid);
//! ```
//!
//! # Configuration
//!
//! [`BuilderOptions`] configures the build phase (dialect, resolver backends,
//! vocabulary/format overrides, casting); [`ValidateOptions`] configures a single
//! `validate` call (error ordering, whether to splice casts).
//!
//! ```rust
//! use jv::Validator;
//! use jv_referencing::Draft;
//! use serde_json::json;
//!
//! let validator = Validator::options()
//!     .draft(Draft::Draft7)
//!     .compile(&json!({"type": "string"}))
//!     .expect("valid schema");
//! assert!(validator.is_valid(&json!("ok")));
//! ```
mod builder;
pub mod cast;
pub mod codec;
pub mod error;
pub mod format;
pub mod key;
pub mod normalizer;
pub mod options;
pub mod output;
pub mod paths;
pub mod retrieve;
mod resolver;
pub mod subschema;
pub mod validator;
pub mod vocabulary;

use std::sync::Arc;

use ahash::AHashMap;
use serde_json::Value;

pub use error::BuildError;
pub use jv_referencing::Draft;
pub use options::{BuilderOptions, ValidateOptions};
pub use output::{Error as ValidationError, ErrorOrder, OutputError, OutputUnit, ValidationOutput};

use crate::{
    codec::Codec,
    key::Key,
    normalizer::Normalizer,
    format::FormatRegistry,
    subschema::Compiled,
    validator::{validate_and_cast, validate_root},
};

impl BuilderOptions {
    /// Run the resolve-then-compile pipeline against `schema`, producing a
    /// reusable [`Validator`] (SPEC_FULL.md §2 "Builder", §3 "Data model").
    ///
    /// # Errors
    /// Propagates any `BuildError` raised while scanning, resolving or compiling.
    pub fn compile(self, schema: &Value) -> Result<Validator, BuildError> {
        let codec = Arc::clone(&self.codec);
        let normalizer = Arc::clone(&self.normalizer);
        let normalized = normalizer.normalize(schema.clone());
        let mut builder = builder::Builder::new(self);
        let (validators, root) = builder.build(&normalized)?;
        let formats = builder.into_formats();
        Ok(Validator { validators, root, formats, codec, normalizer })
    }
}

/// A compiled schema, ready to validate any number of instances
/// (SPEC_FULL.md §2 "Validator").
pub struct Validator {
    validators: AHashMap<Key, Compiled>,
    root: Key,
    formats: FormatRegistry,
    codec: Arc<dyn Codec>,
    normalizer: Arc<dyn Normalizer>,
}

impl Validator {
    /// Start building a [`Validator`] with non-default options.
    #[must_use]
    pub fn options() -> BuilderOptions {
        BuilderOptions::new()
    }

    /// Compile `schema` with default options.
    ///
    /// # Errors
    /// Propagates any `BuildError` raised while scanning, resolving or compiling.
    pub fn compile(schema: &Value) -> Result<Self, BuildError> {
        BuilderOptions::new().compile(schema)
    }

    /// Whether `instance` satisfies this validator, discarding error detail.
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).valid
    }

    /// Validate `instance`, grouping and ordering errors per the default
    /// [`ValidateOptions`] (ascending, no cast splicing).
    #[must_use]
    pub fn validate(&self, instance: &Value) -> ValidationOutput {
        self.validate_with(instance, &ValidateOptions::new())
    }

    /// Validate `instance` with explicit [`ValidateOptions`].
    #[must_use]
    pub fn validate_with(&self, instance: &Value, opts: &ValidateOptions) -> ValidationOutput {
        let normalized = self.normalizer.normalize(instance.clone());
        validate_root(&normalized, &self.validators, &self.root, &self.formats, opts.cast, opts.error_order)
    }

    /// Validate `instance` and, on success, return it with every recorded cast
    /// spliced in at its data path (SPEC_FULL.md §4.6). Subschemas compiled
    /// without `BuilderOptions::cast(true)` never register a cast, so this is
    /// equivalent to a plain validate-and-clone for such validators.
    ///
    /// # Errors
    /// Returns the accumulated [`ValidationOutput`] if `instance` is invalid.
    pub fn cast(&self, instance: &Value) -> Result<Value, ValidationOutput> {
        let normalized = self.normalizer.normalize(instance.clone());
        validate_and_cast(&normalized, &self.validators, &self.root, &self.formats, ErrorOrder::Ascending)
    }

    /// The codec this validator was compiled with (SPEC_FULL.md §4.5).
    #[must_use]
    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Decode `bytes` with this validator's codec, then validate the result.
    ///
    /// # Errors
    /// Returns the codec's decode error message if `bytes` isn't valid input for it.
    pub fn validate_bytes(&self, bytes: &[u8]) -> Result<ValidationOutput, String> {
        let value = self.codec.decode(bytes)?;
        Ok(self.validate(&value))
    }
}

/// A shortcut for validating `instance` against `schema` with default options.
///
/// # Panics
/// Panics if `schema` fails to compile.
#[must_use]
pub fn is_valid(schema: &Value, instance: &Value) -> bool {
    Validator::compile(schema).expect("invalid schema").is_valid(instance)
}

/// Compile `schema` with default options, for repeated validation.
///
/// # Errors
/// Propagates any `BuildError` raised while scanning, resolving or compiling.
pub fn compile(schema: &Value) -> Result<Validator, BuildError> {
    Validator::compile(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn is_valid_shortcut() {
        let schema = json!({"type": "integer", "minimum": 0});
        assert!(is_valid(&schema, &json!(3)));
        assert!(!is_valid(&schema, &json!(-1)));
    }

    #[test]
    fn compiled_validator_is_reusable() {
        let validator = compile(&json!({"type": "string"})).unwrap();
        assert!(validator.is_valid(&json!("a")));
        assert!(validator.is_valid(&json!("b")));
        assert!(!validator.is_valid(&json!(1)));
    }

    #[test]
    fn validate_reports_a_normalized_output_shape() {
        let validator = compile(&json!({"type": "string"})).unwrap();
        let output = validator.validate(&json!(1));
        let as_json = output.to_json();
        assert_eq!(as_json["valid"], json!(false));
        assert!(as_json["details"][0]["errors"][0]["kind"].is_string());
    }

    #[test]
    fn cast_splices_format_casts_when_enabled() {
        let schema = json!({"type": "string", "format": "uuid"});
        let validator = Validator::options().cast(true).compile(&schema).unwrap();
        let id = "550e8400-e29b-41d4-a716-446655440000";
        let cast = validator.cast(&json!(id)).unwrap();
        assert_eq!(cast, json!(id));
    }
}
