//! Builder-method configuration surfaces (SPEC_FULL.md §4.2, §4.3), following the
//! fluent `&mut Self`-returning style of `jsonschema/src/options.rs`.
use std::sync::Arc;

use ahash::AHashMap;
use jv_referencing::{Draft, Retrieve};

use crate::{
    codec::{Codec, NativeCodec},
    format::FormatRegistry,
    normalizer::{IdentityNormalizer, Normalizer},
    output::ErrorOrder,
    vocabulary::VocabularyModule,
};

/// Options threaded through a `Builder`. Single-use: consumed by the one `build!` call
/// it configures, matching the `Resolver`/`Builder` single-use lifecycle (SPEC_FULL.md §3).
pub struct BuilderOptions {
    pub(crate) draft: Option<Draft>,
    pub(crate) backends: Vec<Box<dyn Retrieve>>,
    pub(crate) vocabulary_overrides: AHashMap<String, Arc<dyn VocabularyModule>>,
    pub(crate) formats: FormatRegistry,
    pub(crate) codec: Arc<dyn Codec>,
    pub(crate) cast: bool,
    pub(crate) content_assert: bool,
    pub(crate) normalizer: Arc<dyn Normalizer>,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        BuilderOptions {
            draft: None,
            backends: Vec::new(),
            vocabulary_overrides: AHashMap::default(),
            formats: FormatRegistry::with_builtins(),
            codec: Arc::new(NativeCodec),
            cast: false,
            content_assert: false,
            normalizer: Arc::new(IdentityNormalizer),
        }
    }
}

impl BuilderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dialect to assume when a document declares no `$schema`.
    #[must_use]
    pub fn draft(mut self, draft: Draft) -> Self {
        self.draft = Some(draft);
        self
    }

    #[must_use]
    pub fn default_draft(&self) -> Draft {
        self.draft.unwrap_or_default()
    }

    /// Append a resolver backend to the fetch chain, tried in registration order.
    #[must_use]
    pub fn with_backend(mut self, backend: Box<dyn Retrieve>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Override (or extend) the built-in vocabulary-IRI -> implementation map.
    #[must_use]
    pub fn with_vocabulary(mut self, uri: impl Into<String>, module: Arc<dyn VocabularyModule>) -> Self {
        self.vocabulary_overrides.insert(uri.into(), module);
        self
    }

    #[must_use]
    pub fn with_format(mut self, module: Box<dyn crate::format::FormatValidator>) -> Self {
        self.formats.register(module);
        self
    }

    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Enable the deferred-cast side channel (SPEC_FULL.md §4.6). Off by default.
    #[must_use]
    pub fn cast(mut self, enabled: bool) -> Self {
        self.cast = enabled;
        self
    }

    /// Enforce `contentEncoding`/`contentMediaType`/`contentSchema` as assertions
    /// instead of pure annotations (SPEC_FULL.md §4.4 "Content"). Off by default.
    #[must_use]
    pub fn assert_content(mut self, enabled: bool) -> Self {
        self.content_assert = enabled;
        self
    }

    /// Pass the input schema (and, via the resulting `Validator`, every instance)
    /// through a custom [`Normalizer`] before it reaches the `Resolver`/`Builder`
    /// (SPEC_FULL.md §6 "Schema input"). Identity by default.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }
}

/// Options threaded through a single `validate` call.
#[derive(Clone, Debug)]
pub struct ValidateOptions {
    pub(crate) cast: bool,
    pub(crate) error_order: ErrorOrder,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        ValidateOptions { cast: false, error_order: ErrorOrder::Ascending }
    }
}

impl ValidateOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cast(mut self, enabled: bool) -> Self {
        self.cast = enabled;
        self
    }

    #[must_use]
    pub fn error_order(mut self, order: ErrorOrder) -> Self {
        self.error_order = order;
        self
    }
}
