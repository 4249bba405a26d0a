//! `contentEncoding` / `contentMediaType` / `contentSchema` (SPEC_FULL.md §4.4
//! "Content"): annotation-only by default, matching the 2020-12 text; asserting
//! them (decode, then check the declared media type and nested schema) is opt-in
//! via `BuilderOptions::assert_content`, the same annotation/assertion split
//! `format` has.
use base64::Engine;
use serde_json::{Map, Value};

use crate::{
    error::BuildError,
    validator::ValidationContext,
    vocabulary::{emit, CompileCtx, CompiledVocabulary, SchemaRef, VocabularyModule},
};

const PRIORITY: i32 = 30;

pub struct ContentModule;

impl VocabularyModule for ContentModule {
    fn id(&self) -> &'static str {
        "content"
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn compile(
        &self,
        raw: &Map<String, Value>,
        ctx: &mut CompileCtx<'_>,
    ) -> Result<Option<Box<dyn CompiledVocabulary>>, BuildError> {
        let content_encoding = raw.get("contentEncoding").and_then(Value::as_str).map(String::from);
        let content_media_type = raw.get("contentMediaType").and_then(Value::as_str).map(String::from);
        let content_schema = raw.get("contentSchema").map(|s| ctx.build_sub(s, "contentSchema")).transpose()?;
        if content_encoding.is_none() && content_media_type.is_none() && content_schema.is_none() {
            return Ok(None);
        }
        Ok(Some(Box::new(CompiledContent {
            content_encoding,
            content_media_type,
            content_schema,
            assert: ctx.content_assert(),
        })))
    }
}

struct CompiledContent {
    content_encoding: Option<String>,
    content_media_type: Option<String>,
    content_schema: Option<SchemaRef>,
    assert: bool,
}

impl CompiledVocabulary for CompiledContent {
    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn validate(&self, data: &Value, ctx: &mut ValidationContext<'_>) {
        if !self.assert {
            return;
        }
        let Value::String(raw) = data else { return };
        let Some(decoded) = self.decode(raw, ctx) else { return };
        self.check_media_type_and_schema(&decoded, ctx);
    }
}

impl CompiledContent {
    /// `None` means decoding failed and an error was already recorded; the caller
    /// must not attempt `contentMediaType`/`contentSchema` checks in that case.
    fn decode(&self, raw: &str, ctx: &mut ValidationContext<'_>) -> Option<String> {
        match self.content_encoding.as_deref() {
            Some(encoding) if encoding.eq_ignore_ascii_case("base64") => {
                match base64::engine::general_purpose::STANDARD.decode(raw.as_bytes()) {
                    Ok(bytes) => match String::from_utf8(bytes) {
                        Ok(text) => Some(text),
                        Err(_) => {
                            emit(&mut ctx.errors, "contentEncoding", "decoded content is not valid UTF-8", ctx);
                            None
                        }
                    },
                    Err(_) => {
                        emit(&mut ctx.errors, "contentEncoding", "is not valid base64", ctx);
                        None
                    }
                }
            }
            Some(_) | None => Some(raw.to_string()),
        }
    }

    fn check_media_type_and_schema(&self, decoded: &str, ctx: &mut ValidationContext<'_>) {
        let Some(media_type) = &self.content_media_type else {
            if let Some(schema) = &self.content_schema {
                ctx.validate_schema_ref(&Value::String(decoded.to_string()), schema);
            }
            return;
        };
        if media_type != "application/json" {
            return;
        }
        match serde_json::from_str::<Value>(decoded) {
            Ok(parsed) => {
                if let Some(schema) = &self.content_schema {
                    ctx.validate_schema_ref(&parsed, schema);
                }
            }
            Err(_) => emit(&mut ctx.errors, "contentMediaType", format!("is not valid {media_type}"), ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{builder::Builder, format::FormatRegistry, options::BuilderOptions, output::ErrorOrder, validator::validate_root};
    use serde_json::json;

    #[test]
    fn annotation_only_by_default() {
        let schema = json!({"contentEncoding": "base64", "contentMediaType": "application/json"});
        let (validators, root) = Builder::new(BuilderOptions::new()).build(&schema).unwrap();
        let formats = FormatRegistry::with_builtins();
        let output = validate_root(&json!("not base64 at all!!"), &validators, &root, &formats, false, ErrorOrder::Ascending);
        assert!(output.valid);
    }

    #[test]
    fn asserts_base64_decoding_when_enabled() {
        let schema = json!({"contentEncoding": "base64"});
        let (validators, root) =
            Builder::new(BuilderOptions::new().assert_content(true)).build(&schema).unwrap();
        let formats = FormatRegistry::with_builtins();
        let ok = validate_root(&json!("aGVsbG8="), &validators, &root, &formats, false, ErrorOrder::Ascending);
        assert!(ok.valid);
        let bad = validate_root(&json!("not base64!!"), &validators, &root, &formats, false, ErrorOrder::Ascending);
        assert!(!bad.valid);
    }

    #[test]
    fn asserts_json_media_type_when_enabled() {
        let schema = json!({"contentMediaType": "application/json"});
        let (validators, root) =
            Builder::new(BuilderOptions::new().assert_content(true)).build(&schema).unwrap();
        let formats = FormatRegistry::with_builtins();
        let ok = validate_root(&json!("{\"a\": 1}"), &validators, &root, &formats, false, ErrorOrder::Ascending);
        assert!(ok.valid);
        let bad = validate_root(&json!("not json"), &validators, &root, &formats, false, ErrorOrder::Ascending);
        assert!(!bad.valid);
    }
}
