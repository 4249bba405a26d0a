//! `unevaluatedProperties` / `unevaluatedItems` (2020-12 only; SPEC_FULL.md §4.2
//! "Unevaluated", §4.3 "Evaluation tracking"). Declared with the highest built-in
//! priority so it runs after every sibling keyword in the same subschema has had a
//! chance to record its matches: `properties`/`patternProperties`/`items` and the
//! `allOf`/`anyOf`/`oneOf`/`if`-`then`-`else` branches that matched, plus anything a
//! `$ref` reached, have all merged into the current evaluated set by the time this
//! module's `validate` runs.
use serde_json::{Map, Value};

use crate::{
    error::BuildError,
    validator::{EvaluatedKey, ValidationContext},
    vocabulary::{CompileCtx, CompiledVocabulary, SchemaRef, VocabularyModule},
};

const PRIORITY: i32 = 90;

pub struct UnevaluatedModule;

impl VocabularyModule for UnevaluatedModule {
    fn id(&self) -> &'static str {
        "unevaluated"
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn compile(
        &self,
        raw: &Map<String, Value>,
        ctx: &mut CompileCtx<'_>,
    ) -> Result<Option<Box<dyn CompiledVocabulary>>, BuildError> {
        let properties =
            raw.get("unevaluatedProperties").map(|s| ctx.build_sub(s, "unevaluatedProperties")).transpose()?;
        let items = raw.get("unevaluatedItems").map(|s| ctx.build_sub(s, "unevaluatedItems")).transpose()?;
        if properties.is_none() && items.is_none() {
            return Ok(None);
        }
        Ok(Some(Box::new(CompiledUnevaluated { properties, items })))
    }
}

struct CompiledUnevaluated {
    properties: Option<SchemaRef>,
    items: Option<SchemaRef>,
}

impl CompiledVocabulary for CompiledUnevaluated {
    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn validate(&self, data: &Value, ctx: &mut ValidationContext<'_>) {
        if let (Value::Object(map), Some(sub)) = (data, &self.properties) {
            self.validate_properties(map, sub, ctx);
        }
        if let (Value::Array(items), Some(sub)) = (data, &self.items) {
            self.validate_items(items, sub, ctx);
        }
    }
}

impl CompiledUnevaluated {
    fn validate_properties(&self, map: &Map<String, Value>, sub: &SchemaRef, ctx: &mut ValidationContext<'_>) {
        let already = ctx.evaluated_here().clone();
        for (name, value) in map {
            if already.contains(&EvaluatedKey::Property(name.clone())) {
                continue;
            }
            ctx.validate_in(value, EvaluatedKey::Property(name.clone()), sub);
        }
    }

    fn validate_items(&self, items: &[Value], sub: &SchemaRef, ctx: &mut ValidationContext<'_>) {
        let already = ctx.evaluated_here().clone();
        for (i, item) in items.iter().enumerate() {
            if already.contains(&EvaluatedKey::Index(i)) {
                continue;
            }
            ctx.validate_in(item, EvaluatedKey::Index(i), sub);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{builder::Builder, format::FormatRegistry, options::BuilderOptions, output::ErrorOrder, validator::validate_root};
    use serde_json::json;

    fn check(schema: serde_json::Value, instance: serde_json::Value) -> bool {
        let (validators, root) = Builder::new(BuilderOptions::new()).build(&schema).unwrap();
        let formats = FormatRegistry::with_builtins();
        validate_root(&instance, &validators, &root, &formats, false, ErrorOrder::Ascending).valid
    }

    #[test]
    fn rejects_properties_not_covered_by_properties_or_patterns() {
        let schema = json!({
            "properties": {"a": {"type": "string"}},
            "unevaluatedProperties": false
        });
        assert!(check(schema.clone(), json!({"a": "x"})));
        assert!(!check(schema, json!({"a": "x", "b": 1})));
    }

    #[test]
    fn properties_matched_through_allof_count_as_evaluated() {
        let schema = json!({
            "allOf": [{"properties": {"a": {"type": "string"}}}],
            "unevaluatedProperties": false
        });
        assert!(check(schema, json!({"a": "x"})));
    }

    #[test]
    fn rejects_items_beyond_prefix_items() {
        let schema = json!({
            "prefixItems": [{"type": "string"}],
            "unevaluatedItems": false
        });
        assert!(check(schema.clone(), json!(["a"])));
        assert!(!check(schema, json!(["a", 1])));
    }
}
