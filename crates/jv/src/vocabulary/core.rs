//! `$ref` / `$dynamicRef` dereferencing (SPEC_FULL.md §4.2 "core"). `$id`, `$anchor`
//! and `$dynamicAnchor` need no validate-time behavior of their own - the resolver
//! already turned them into addressable `Key`s while scanning the document.
use serde_json::{Map, Value};

use crate::{
    error::BuildError,
    key::{Key, Namespace},
    validator::ValidationContext,
    vocabulary::{CompileCtx, CompiledVocabulary, VocabularyModule},
};

const PRIORITY: i32 = 0;

pub struct CoreModule;

impl VocabularyModule for CoreModule {
    fn id(&self) -> &'static str {
        "core"
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn compile(
        &self,
        raw: &Map<String, Value>,
        ctx: &mut CompileCtx<'_>,
    ) -> Result<Option<Box<dyn CompiledVocabulary>>, BuildError> {
        let mut refs = Vec::new();
        if let Some(r) = raw.get("$ref").and_then(Value::as_str) {
            refs.push(CompiledRef::Static(ctx.resolve_ref(r, false)?));
        }
        if let Some(r) = raw.get("$dynamicRef").and_then(Value::as_str) {
            let key = ctx.resolve_ref(r, true)?;
            refs.push(match key {
                Key::DynamicAnchor { ns, name } => CompiledRef::Dynamic { fallback_ns: ns, name },
                other => CompiledRef::Static(other),
            });
        }
        if refs.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(CompiledCore { refs })))
    }
}

enum CompiledRef {
    Static(Key),
    Dynamic { fallback_ns: Namespace, name: String },
}

struct CompiledCore {
    refs: Vec<CompiledRef>,
}

impl CompiledVocabulary for CompiledCore {
    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn validate(&self, data: &Value, ctx: &mut ValidationContext<'_>) {
        for r in &self.refs {
            match r {
                CompiledRef::Static(key) => ctx.validate_ref(data, key, "$ref"),
                CompiledRef::Dynamic { fallback_ns, name } => {
                    let key = ctx.resolve_dynamic(fallback_ns, name);
                    ctx.validate_ref(data, &key, "$dynamicRef");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{builder::Builder, options::BuilderOptions, output::ErrorOrder, validator::validate_root};
    use serde_json::json;

    #[test]
    fn ref_dereferences_to_its_target() {
        let schema = json!({
            "$defs": { "pos": { "type": "integer", "minimum": 0 } },
            "$ref": "#/$defs/pos"
        });
        let (validators, root) = Builder::new(BuilderOptions::new()).build(&schema).unwrap();
        let formats = crate::format::FormatRegistry::with_builtins();
        let ok = validate_root(&json!(3), &validators, &root, &formats, false, ErrorOrder::Ascending);
        assert!(ok.valid);
        let bad = validate_root(&json!(-1), &validators, &root, &formats, false, ErrorOrder::Ascending);
        assert!(!bad.valid);
    }

    #[test]
    fn dynamic_ref_resolves_to_outermost_scope() {
        let schema = json!({
            "$id": "https://example.com/root.json",
            "$ref": "list.json",
            "$defs": {
                "item": { "$dynamicAnchor": "item", "type": "string" }
            }
        });
        let list = json!({
            "$id": "https://example.com/list.json",
            "type": "array",
            "items": { "$dynamicRef": "#item" },
            "$defs": { "item": { "$dynamicAnchor": "item", "type": "number" } }
        });
        let mut builder = Builder::new(BuilderOptions::new().with_backend(Box::new(StaticRetriever(list))));
        let (validators, root) = builder.build(&schema).unwrap();
        let formats = crate::format::FormatRegistry::with_builtins();
        let ok = validate_root(&json!(["a", "b"]), &validators, &root, &formats, false, ErrorOrder::Ascending);
        assert!(ok.valid, "outer $defs/item (type: string) should win over list.json's own");
    }

    struct StaticRetriever(serde_json::Value);

    impl jv_referencing::Retrieve for StaticRetriever {
        fn retrieve(
            &self,
            uri: &jv_referencing::Uri<&str>,
        ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
            if uri.as_str() == "https://example.com/list.json" {
                Ok(self.0.clone())
            } else {
                Err("no such document".into())
            }
        }
    }
}
