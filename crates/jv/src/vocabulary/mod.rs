//! The keyword-family plug-in interface compiled subschemas are built from
//! (SPEC_FULL.md §4.4).
//!
//! Each `[MODULE]` of the spec becomes one [`VocabularyModule`]: given the raw keyword
//! map of a subschema, it either declines (`Ok(None)`, nothing in `raw` belongs to it)
//! or produces one [`CompiledVocabulary`] that knows how to validate against that
//! module's share of `raw`. This folds the spec's per-keyword-pair `handle_keyword`/
//! `finalize_validators` pipeline into a single pass per module - idiomatic for a
//! statically-typed host where each module already knows its whole keyword set ahead
//! of time, unlike the dynamically-dispatched original this was distilled from.
use ahash::AHashMap;
use jv_referencing::Draft;
use serde_json::Value;

use crate::{
    builder::Builder,
    error::BuildError,
    format::FormatRegistry,
    key::{Key, Ref},
    output::Error,
    paths::{Chunk, SchemaPath},
    subschema::Compiled,
    validator::ValidationContext,
};

pub mod applicator;
pub mod cast_vocab;
pub mod content;
pub mod core;
pub mod format_vocab;
pub mod metadata;
pub mod unevaluated;
pub mod validation;

/// One compiled schema a nested keyword points at: inline (compiled as part of the
/// parent's own pass) or a separately staged `Key` (an `$id`-bearing subschema).
#[derive(Clone, Debug)]
pub enum SchemaRef {
    Inline(std::sync::Arc<Compiled>),
    Key(Key),
}

/// Handle threaded through a single subschema's compilation, letting vocabulary
/// modules stage nested schemas without owning the builder themselves
/// (SPEC_FULL.md §4.2 "Sub-schema handling during compilation").
pub struct CompileCtx<'b> {
    pub(crate) builder: &'b mut Builder,
    pub schema_path: SchemaPath,
    pub ns: crate::key::Namespace,
    pub draft: Draft,
}

impl<'b> CompileCtx<'b> {
    /// Compile (or stage) a nested raw schema found at `self.schema_path` + `suffix`.
    ///
    /// # Errors
    /// Propagates any `BuildError` from resolving or compiling `raw`.
    pub fn build_sub(&mut self, raw: &Value, suffix: impl Into<Chunk>) -> Result<SchemaRef, BuildError> {
        let child_path = self.schema_path.push(suffix);
        self.builder.build_sub(raw, &self.ns, self.draft, child_path)
    }

    /// Like [`Self::build_sub`], for an array-valued keyword's `index`-th member
    /// (`allOf/0`, `prefixItems/2`, ...).
    ///
    /// # Errors
    /// Propagates any `BuildError` from resolving or compiling `raw`.
    pub fn build_sub_indexed(
        &mut self,
        raw: &Value,
        group: &'static str,
        index: usize,
    ) -> Result<SchemaRef, BuildError> {
        let child_path = self.schema_path.push(group).push(index);
        self.builder.build_sub(raw, &self.ns, self.draft, child_path)
    }

    /// Like [`Self::build_sub`], for a map-valued keyword's entry named `name`
    /// (`properties/foo`, `patternProperties/^a`, ...).
    ///
    /// # Errors
    /// Propagates any `BuildError` from resolving or compiling `raw`.
    pub fn build_sub_named(
        &mut self,
        raw: &Value,
        group: &'static str,
        name: impl Into<Chunk>,
    ) -> Result<SchemaRef, BuildError> {
        let child_path = self.schema_path.push(group).push(name);
        self.builder.build_sub(raw, &self.ns, self.draft, child_path)
    }

    /// Parse and stage a `$ref`/`$dynamicRef` string found in the current namespace,
    /// returning the `Key` validation should dereference against
    /// (SPEC_FULL.md §4.2 "Dynamic anchors").
    ///
    /// # Errors
    /// Propagates any `BuildError` from parsing or resolving `raw`.
    pub fn resolve_ref(&mut self, raw: &str, dynamic: bool) -> Result<Key, BuildError> {
        let reference = Ref::parse(&self.ns, raw, dynamic)?;
        let key = self.builder.resolve_ref(&reference)?;
        if dynamic {
            self.builder.stage_dynamic_all(&key);
        }
        self.builder.stage_key(key.clone());
        Ok(key)
    }

    #[must_use]
    pub fn cast_enabled(&self) -> bool {
        self.builder.cast_enabled()
    }

    #[must_use]
    pub fn formats(&self) -> &FormatRegistry {
        self.builder.formats()
    }

    #[must_use]
    pub fn content_assert(&self) -> bool {
        self.builder.content_assert()
    }
}

/// A keyword-family plug-in. Implementations are stateless; all per-compile state
/// lives in the `Box<dyn CompiledVocabulary>` a successful `compile` returns.
pub trait VocabularyModule: Send + Sync {
    /// Stable identifier, used for the internal `Cast` special-case and diagnostics.
    fn id(&self) -> &'static str;

    /// Smaller runs first during validation (SPEC_FULL.md §4.4).
    fn priority(&self) -> i32;

    /// Inspect `raw`'s keywords and produce this module's contribution, if any.
    /// `Ok(None)` means none of `raw`'s keywords belong to this module.
    ///
    /// # Errors
    /// Returns `BuildError` if one of this module's keywords has an invalid shape,
    /// or a nested sub-schema fails to compile.
    fn compile(
        &self,
        raw: &serde_json::Map<String, Value>,
        ctx: &mut CompileCtx<'_>,
    ) -> Result<Option<Box<dyn CompiledVocabulary>>, BuildError>;
}

/// The compiled, validate-time half of a [`VocabularyModule`]'s contribution.
pub trait CompiledVocabulary: Send + Sync {
    fn priority(&self) -> i32;

    /// Validate `data` against this module's compiled state, accumulating errors into
    /// `ctx.errors` and pushing any evaluated keys into `ctx`'s evaluation tracker.
    /// Returns the (possibly cast-side-channel-relevant) value the next module sees.
    fn validate(&self, data: &Value, ctx: &mut ValidationContext<'_>);
}

/// All built-in modules, in declaration order (sorting by `priority` happens in the
/// builder). Vocabulary IRIs map onto these per dialect (SPEC_FULL.md §6).
///
/// The internal `Cast` vocabulary (SPEC_FULL.md §4.2 step 1, "prepend the internal
/// Cast vocabulary") is deliberately not here: it is not addressed by any vocabulary
/// URI, runs unconditionally, and its one output (a [`crate::cast::CastDescriptor`])
/// is lifted straight into `Subschema.cast` rather than living in the validators list
/// - see [`cast_vocab::compile`], called directly by the builder.
#[must_use]
pub fn builtin_modules() -> Vec<std::sync::Arc<dyn VocabularyModule>> {
    vec![
        std::sync::Arc::new(core::CoreModule),
        std::sync::Arc::new(validation::ValidationModule),
        std::sync::Arc::new(applicator::ApplicatorModule),
        std::sync::Arc::new(unevaluated::UnevaluatedModule),
        std::sync::Arc::new(content::ContentModule),
        std::sync::Arc::new(format_vocab::FormatModule { assert: false }),
        std::sync::Arc::new(format_vocab::FormatModule { assert: true }),
        std::sync::Arc::new(metadata::MetaDataModule),
    ]
}

/// Vocabulary IRI -> built-in module id, per dialect (SPEC_FULL.md §6).
#[must_use]
pub fn vocabulary_module_ids() -> AHashMap<&'static str, &'static str> {
    [
        ("https://json-schema.org/draft/2020-12/vocab/core", "core"),
        ("https://json-schema.org/draft/2020-12/vocab/applicator", "applicator"),
        ("https://json-schema.org/draft/2020-12/vocab/unevaluated", "unevaluated"),
        ("https://json-schema.org/draft/2020-12/vocab/validation", "validation"),
        ("https://json-schema.org/draft/2020-12/vocab/meta-data", "metadata"),
        ("https://json-schema.org/draft/2020-12/vocab/format-annotation", "format"),
        ("https://json-schema.org/draft/2020-12/vocab/format-assertion", "format-assert"),
        ("https://json-schema.org/draft/2020-12/vocab/content", "content"),
    ]
    .into_iter()
    .collect()
}

pub(crate) fn emit(
    errors: &mut Vec<Error>,
    kind: &'static str,
    message: impl Into<String>,
    ctx: &ValidationContext<'_>,
) {
    errors.push(Error::new(
        kind,
        message,
        ctx.data_path.clone(),
        ctx.eval_path.clone(),
        ctx.schema_path.clone(),
    ));
}
