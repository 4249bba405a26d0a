//! Compiled schema forms stored under each reachable `Key` (SPEC_FULL.md §3).
use crate::{cast::CastDescriptor, paths::SchemaPath, vocabulary::CompiledVocabulary};

/// A fully compiled object/array/string/... schema: its sorted validator list plus
/// the (at most one) deferred cast it carries.
pub struct Subschema {
    pub validators: Vec<Box<dyn CompiledVocabulary>>,
    pub schema_path: SchemaPath,
    pub cast: Option<CastDescriptor>,
}

/// `true`/`false` schemas compile to a constant accept/reject rather than an empty
/// validator list, so validation never needs to special-case "no keywords".
pub struct BooleanSchema {
    pub valid: bool,
    pub schema_path: SchemaPath,
}

/// What a `Key` in the compiled map, or a [`crate::vocabulary::SchemaRef::Inline`],
/// ultimately resolves to.
pub enum Compiled {
    Boolean(BooleanSchema),
    Schema(Subschema),
}

impl Compiled {
    #[must_use]
    pub fn schema_path(&self) -> &SchemaPath {
        match self {
            Compiled::Boolean(b) => &b.schema_path,
            Compiled::Schema(s) => &s.schema_path,
        }
    }
}
