//! Annotation keywords with no validate-time effect (SPEC_FULL.md §4.4
//! "MetaData"): `title`, `description`, `default`, `examples`, `deprecated`,
//! `readOnly`, `writeOnly`. Recognizing them here just means a schema that uses
//! only these keywords still compiles to a (trivially passing) validator instead
//! of silently producing no vocabulary contribution at all.
use serde_json::{Map, Value};

use crate::{
    error::BuildError,
    validator::ValidationContext,
    vocabulary::{CompileCtx, CompiledVocabulary, VocabularyModule},
};

const PRIORITY: i32 = 5;

const KEYWORDS: &[&str] =
    &["title", "description", "default", "examples", "deprecated", "readOnly", "writeOnly"];

pub struct MetaDataModule;

impl VocabularyModule for MetaDataModule {
    fn id(&self) -> &'static str {
        "metadata"
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn compile(
        &self,
        raw: &Map<String, Value>,
        _ctx: &mut CompileCtx<'_>,
    ) -> Result<Option<Box<dyn CompiledVocabulary>>, BuildError> {
        if KEYWORDS.iter().any(|k| raw.contains_key(*k)) {
            Ok(Some(Box::new(CompiledMetaData)))
        } else {
            Ok(None)
        }
    }
}

struct CompiledMetaData;

impl CompiledVocabulary for CompiledMetaData {
    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn validate(&self, _data: &Value, _ctx: &mut ValidationContext<'_>) {}
}
