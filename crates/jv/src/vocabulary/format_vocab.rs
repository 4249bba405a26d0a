//! `format` (SPEC_FULL.md §4.4 "Format"): string-format checking, with an
//! annotation-only variant and an assertion variant sharing the same compiled
//! state, parameterised by `{assert: bool}` just as the dialects' two vocabulary
//! IRIs (`format-annotation`, `format-assertion`) select between them.
use serde_json::{Map, Value};

use crate::{
    error::BuildError,
    validator::ValidationContext,
    vocabulary::{emit, CompileCtx, CompiledVocabulary, VocabularyModule},
};

const PRIORITY: i32 = 40;

pub struct FormatModule {
    pub assert: bool,
}

impl VocabularyModule for FormatModule {
    fn id(&self) -> &'static str {
        if self.assert {
            "format-assert"
        } else {
            "format"
        }
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn compile(
        &self,
        raw: &Map<String, Value>,
        _ctx: &mut CompileCtx<'_>,
    ) -> Result<Option<Box<dyn CompiledVocabulary>>, BuildError> {
        let Some(format) = raw.get("format").and_then(Value::as_str) else {
            return Ok(None);
        };
        Ok(Some(Box::new(CompiledFormat { format: format.to_string(), assert: self.assert })))
    }
}

struct CompiledFormat {
    format: String,
    assert: bool,
}

impl CompiledVocabulary for CompiledFormat {
    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn validate(&self, data: &Value, ctx: &mut ValidationContext<'_>) {
        if !self.assert {
            return;
        }
        if let Err(reason) = ctx.formats.check(&self.format, data) {
            emit(&mut ctx.errors, "format", reason, ctx);
        }
    }
}
