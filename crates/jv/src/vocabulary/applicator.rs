//! Keywords that apply nested subschemas to all or part of the instance
//! (SPEC_FULL.md §4.2 "applicator"): `properties`, `patternProperties`,
//! `additionalProperties`, `propertyNames`, `items`/`prefixItems`/`additionalItems`,
//! `contains`, `allOf`/`anyOf`/`oneOf`/`not`, `if`/`then`/`else`, `dependentSchemas`
//! (and Draft 7's combined `dependencies`, for its schema-valued entries).
use ahash::AHashMap;
use jv_referencing::Draft;
use serde_json::{Map, Value};

use crate::{
    error::BuildError,
    output::Error,
    validator::{EvaluatedKey, ValidationContext},
    vocabulary::{emit, CompileCtx, CompiledVocabulary, SchemaRef, VocabularyModule},
};

const PRIORITY: i32 = 20;

pub struct ApplicatorModule;

impl VocabularyModule for ApplicatorModule {
    fn id(&self) -> &'static str {
        "applicator"
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn compile(
        &self,
        raw: &Map<String, Value>,
        ctx: &mut CompileCtx<'_>,
    ) -> Result<Option<Box<dyn CompiledVocabulary>>, BuildError> {
        let mut out = CompiledApplicator::default();
        let mut any = false;

        if let Some(props) = raw.get("properties").and_then(Value::as_object) {
            let mut map = AHashMap::default();
            for (name, sub) in props {
                map.insert(name.clone(), ctx.build_sub_named(sub, "properties", name.clone())?);
            }
            out.properties = Some(map);
            any = true;
        }
        if let Some(pp) = raw.get("patternProperties").and_then(Value::as_object) {
            let mut list = Vec::new();
            for (pattern, sub) in pp {
                let regex = fancy_regex::Regex::new(pattern)
                    .map_err(|_| BuildError::invalid_sub_schema("patternProperties key is not a valid regex"))?;
                list.push((regex, ctx.build_sub_named(sub, "patternProperties", pattern.clone())?));
            }
            out.pattern_properties = Some(list);
            any = true;
        }
        if let Some(ap) = raw.get("additionalProperties") {
            out.additional_properties = Some(ctx.build_sub(ap, "additionalProperties")?);
            any = true;
        }
        if let Some(pn) = raw.get("propertyNames") {
            out.property_names = Some(ctx.build_sub(pn, "propertyNames")?);
            any = true;
        }

        match ctx.draft {
            Draft::Draft202012 => {
                if let Some(prefix) = raw.get("prefixItems").and_then(Value::as_array) {
                    let mut list = Vec::new();
                    for (i, item) in prefix.iter().enumerate() {
                        list.push(ctx.build_sub_indexed(item, "prefixItems", i)?);
                    }
                    out.prefix_items = Some(list);
                    any = true;
                }
                if let Some(items) = raw.get("items") {
                    out.items = Some(ctx.build_sub(items, "items")?);
                    any = true;
                }
            }
            Draft::Draft7 => match raw.get("items") {
                Some(Value::Array(items)) => {
                    let mut list = Vec::new();
                    for (i, item) in items.iter().enumerate() {
                        list.push(ctx.build_sub_indexed(item, "items", i)?);
                    }
                    out.prefix_items = Some(list);
                    any = true;
                    if let Some(ai) = raw.get("additionalItems") {
                        out.items = Some(ctx.build_sub(ai, "additionalItems")?);
                    }
                }
                Some(single) => {
                    out.items = Some(ctx.build_sub(single, "items")?);
                    any = true;
                }
                None => {}
            },
        }

        if let Some(contains) = raw.get("contains") {
            out.contains = Some(ctx.build_sub(contains, "contains")?);
            if ctx.draft == Draft::Draft202012 {
                out.min_contains = raw.get("minContains").and_then(Value::as_u64);
                out.max_contains = raw.get("maxContains").and_then(Value::as_u64);
            }
            any = true;
        }
        if let Some(list) = raw.get("allOf").and_then(Value::as_array) {
            out.all_of = Some(compile_list(ctx, list, "allOf")?);
            any = true;
        }
        if let Some(list) = raw.get("anyOf").and_then(Value::as_array) {
            out.any_of = Some(compile_list(ctx, list, "anyOf")?);
            any = true;
        }
        if let Some(list) = raw.get("oneOf").and_then(Value::as_array) {
            out.one_of = Some(compile_list(ctx, list, "oneOf")?);
            any = true;
        }
        if let Some(not) = raw.get("not") {
            out.not = Some(ctx.build_sub(not, "not")?);
            any = true;
        }
        if raw.contains_key("then") || raw.contains_key("else") {
            if let Some(if_) = raw.get("if") {
                out.if_ = Some(ctx.build_sub(if_, "if")?);
                any = true;
            }
        }
        if let Some(then) = raw.get("then") {
            out.then_ = Some(ctx.build_sub(then, "then")?);
            any = true;
        }
        if let Some(else_) = raw.get("else") {
            out.else_ = Some(ctx.build_sub(else_, "else")?);
            any = true;
        }

        let mut dependent_schemas = Vec::new();
        if let Some(deps) = raw.get("dependentSchemas").and_then(Value::as_object) {
            for (name, sub) in deps {
                dependent_schemas.push((name.clone(), ctx.build_sub_named(sub, "dependentSchemas", name.clone())?));
            }
        }
        if ctx.draft == Draft::Draft7 {
            if let Some(deps) = raw.get("dependencies").and_then(Value::as_object) {
                for (name, sub) in deps {
                    if sub.is_object() || sub.is_boolean() {
                        dependent_schemas.push((name.clone(), ctx.build_sub_named(sub, "dependencies", name.clone())?));
                    }
                }
            }
        }
        if !dependent_schemas.is_empty() {
            out.dependent_schemas = Some(dependent_schemas);
            any = true;
        }

        if !any {
            return Ok(None);
        }
        Ok(Some(Box::new(out)))
    }
}

fn compile_list(ctx: &mut CompileCtx<'_>, list: &[Value], group: &'static str) -> Result<Vec<SchemaRef>, BuildError> {
    list.iter().enumerate().map(|(i, item)| ctx.build_sub_indexed(item, group, i)).collect()
}

#[derive(Default)]
struct CompiledApplicator {
    properties: Option<AHashMap<String, SchemaRef>>,
    pattern_properties: Option<Vec<(fancy_regex::Regex, SchemaRef)>>,
    additional_properties: Option<SchemaRef>,
    property_names: Option<SchemaRef>,
    /// `prefixItems` (2020-12) or the tuple form of `items` (Draft 7).
    prefix_items: Option<Vec<SchemaRef>>,
    /// `items` after `prefixItems` (2020-12), `additionalItems` (Draft 7), or the
    /// single-schema form of `items` in either dialect.
    items: Option<SchemaRef>,
    contains: Option<SchemaRef>,
    /// `minContains`/`maxContains` (2020-12 only; meaningless without `contains`).
    min_contains: Option<u64>,
    max_contains: Option<u64>,
    all_of: Option<Vec<SchemaRef>>,
    any_of: Option<Vec<SchemaRef>>,
    one_of: Option<Vec<SchemaRef>>,
    not: Option<SchemaRef>,
    if_: Option<SchemaRef>,
    then_: Option<SchemaRef>,
    else_: Option<SchemaRef>,
    dependent_schemas: Option<Vec<(String, SchemaRef)>>,
}

impl CompiledVocabulary for CompiledApplicator {
    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn validate(&self, data: &Value, ctx: &mut ValidationContext<'_>) {
        if let Value::Object(map) = data {
            self.validate_object(map, ctx);
        }
        if let Value::Array(items) = data {
            self.validate_array(items, ctx);
        }
        self.validate_applicators(data, ctx);
    }
}

impl CompiledApplicator {
    fn validate_object(&self, map: &Map<String, Value>, ctx: &mut ValidationContext<'_>) {
        if let Some(properties) = &self.properties {
            for (name, value) in map {
                if let Some(sub) = properties.get(name) {
                    ctx.validate_in(value, EvaluatedKey::Property(name.clone()), sub);
                }
            }
        }
        if let Some(pattern_properties) = &self.pattern_properties {
            for (name, value) in map {
                for (pattern, sub) in pattern_properties {
                    if pattern.is_match(name).unwrap_or(false) {
                        ctx.validate_in(value, EvaluatedKey::Property(name.clone()), sub);
                    }
                }
            }
        }
        if let Some(additional) = &self.additional_properties {
            for (name, value) in map {
                if self.is_matched_property(name) {
                    continue;
                }
                ctx.validate_in(value, EvaluatedKey::Property(name.clone()), additional);
            }
        }
        if let Some(property_names) = &self.property_names {
            for name in map.keys() {
                ctx.validate_schema_ref(&Value::String(name.clone()), property_names);
            }
        }
        if let Some(dependent_schemas) = &self.dependent_schemas {
            for (trigger, sub) in dependent_schemas {
                if map.contains_key(trigger) {
                    let produced = ctx.validate_as(&Value::Object(map.clone()), sub);
                    for error in produced {
                        ctx.errors.push(error);
                    }
                }
            }
        }
    }

    fn is_matched_property(&self, name: &str) -> bool {
        self.properties.as_ref().is_some_and(|p| p.contains_key(name))
            || self
                .pattern_properties
                .as_ref()
                .is_some_and(|list| list.iter().any(|(re, _)| re.is_match(name).unwrap_or(false)))
    }

    fn validate_array(&self, items: &[Value], ctx: &mut ValidationContext<'_>) {
        let prefix_len = self.prefix_items.as_ref().map_or(0, Vec::len);
        if let Some(prefix) = &self.prefix_items {
            for (i, (item, sub)) in items.iter().zip(prefix).enumerate() {
                ctx.validate_in(item, EvaluatedKey::Index(i), sub);
            }
        }
        if let Some(rest) = &self.items {
            for (i, item) in items.iter().enumerate().skip(prefix_len) {
                ctx.validate_in(item, EvaluatedKey::Index(i), rest);
            }
        }
        if let Some(contains) = &self.contains {
            // Every item is attempted (not just until the first match) so every
            // index that satisfies `contains` is recorded evaluated, and so
            // `minContains`/`maxContains` can count the true match total.
            let matches =
                items.iter().enumerate().filter(|(i, item)| ctx.validate_in(item, EvaluatedKey::Index(*i), contains)).count();
            match (self.min_contains, self.max_contains) {
                (None, None) => {
                    if matches == 0 {
                        emit(&mut ctx.errors, "contains", "no item matches the `contains` schema", ctx);
                    }
                }
                (min, max) => {
                    let min = min.unwrap_or(1);
                    if (matches as u64) < min {
                        emit(&mut ctx.errors, "minContains", format!("only {matches} item(s) match `contains`, expected at least {min}"), ctx);
                    }
                    if let Some(max) = max {
                        if matches as u64 > max {
                            emit(&mut ctx.errors, "maxContains", format!("{matches} item(s) match `contains`, expected at most {max}"), ctx);
                        }
                    }
                }
            }
        }
    }

    fn validate_applicators(&self, data: &Value, ctx: &mut ValidationContext<'_>) {
        if let Some(all_of) = &self.all_of {
            for sub in all_of {
                let produced = ctx.validate_as(data, sub);
                ctx.errors.extend(produced);
            }
        }
        if let Some(any_of) = &self.any_of {
            let mut all_errors = Vec::new();
            let mut matched = false;
            for sub in any_of {
                let produced = ctx.validate_as(data, sub);
                if produced.is_empty() {
                    matched = true;
                } else {
                    all_errors.extend(produced);
                }
            }
            if !matched {
                push_with_details(ctx, "anyOf", "does not match any of the allowed schemas", all_errors);
            }
        }
        if let Some(one_of) = &self.one_of {
            let mut matches = Vec::new();
            let mut all_errors = Vec::new();
            for sub in one_of {
                let produced = ctx.validate_as(data, sub);
                if produced.is_empty() {
                    matches.push(());
                } else {
                    all_errors.extend(produced);
                }
            }
            if matches.len() != 1 {
                let message = if matches.is_empty() {
                    "does not match any of the schemas in `oneOf`".to_string()
                } else {
                    format!("matches {} schemas in `oneOf`, expected exactly one", matches.len())
                };
                push_with_details(ctx, "oneOf", message, all_errors);
            }
        }
        if let Some(not) = &self.not {
            let produced = ctx.validate_detach(data, not);
            if produced.is_empty() {
                emit(&mut ctx.errors, "not", "matches a schema it must not match", ctx);
            }
        }
        if let Some(if_) = &self.if_ {
            let produced = ctx.validate_as(data, if_);
            if produced.is_empty() {
                if let Some(then_) = &self.then_ {
                    let produced = ctx.validate_as(data, then_);
                    ctx.errors.extend(produced);
                }
            } else if let Some(else_) = &self.else_ {
                let produced = ctx.validate_as(data, else_);
                ctx.errors.extend(produced);
            }
        } else if let Some(else_) = &self.else_ {
            let produced = ctx.validate_as(data, else_);
            ctx.errors.extend(produced);
        }
    }
}

fn push_with_details(ctx: &mut ValidationContext<'_>, kind: &'static str, message: impl Into<String>, details: Vec<Error>) {
    let error = Error::new(kind, message, ctx.data_path.clone(), ctx.eval_path.clone(), ctx.schema_path.clone())
        .with_details(details);
    ctx.errors.push(error);
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
    fn properties_and_additional_properties() {
        let schema = json!({"properties": {"a": {"type": "string"}}, "additionalProperties": false});
        assert!(check(schema.clone(), json!({"a": "x"})));
        assert!(!check(schema, json!({"a": "x", "b": 1})));
    }

    #[test]
    fn one_of_exclusivity() {
        let schema = json!({"oneOf": [{"type": "string"}, {"minLength": 1}]});
        assert!(!check(schema.clone(), json!("x")), "matches both branches, should fail");
        assert!(check(schema, json!(5)));
    }

    #[test]
    fn if_then_else() {
        let schema = json!({
            "if": {"properties": {"kind": {"const": "a"}}},
            "then": {"required": ["a_field"]},
            "else": {"required": ["b_field"]}
        });
        assert!(check(schema.clone(), json!({"kind": "a", "a_field": 1})));
        assert!(!check(schema.clone(), json!({"kind": "a"})));
        assert!(check(schema, json!({"kind": "b", "b_field": 1})));
    }

    #[test]
    fn contains_requires_at_least_one_match() {
        let schema = json!({"contains": {"type": "number"}});
        assert!(check(schema.clone(), json!(["a", 1, "b"])));
        assert!(!check(schema, json!(["a", "b"])));
    }

    #[test]
    fn min_contains_counts_every_matching_item() {
        let schema = json!({"contains": {"type": "number"}, "minContains": 2});
        assert!(!check(schema.clone(), json!(["a", 1, "b"])));
        assert!(check(schema, json!(["a", 1, 2, "b"])));
    }

    #[test]
    fn max_contains_rejects_too_many_matches() {
        let schema = json!({"contains": {"type": "number"}, "maxContains": 1});
        assert!(check(schema.clone(), json!(["a", 1, "b"])));
        assert!(!check(schema, json!(["a", 1, 2, "b"])));
    }

    #[test]
    fn min_contains_zero_allows_no_matches() {
        let schema = json!({"contains": {"type": "number"}, "minContains": 0});
        assert!(check(schema, json!(["a", "b"])));
    }

    #[test]
    fn unevaluated_items_sees_every_item_contains_matched() {
        let schema = json!({
            "contains": {"type": "number"},
            "unevaluatedItems": false
        });
        assert!(check(schema, json!([1, 2, 3])));
    }
}
