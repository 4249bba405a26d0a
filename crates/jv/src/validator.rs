//! The recursive evaluator: walks a compiled validator graph against an instance,
//! accumulating errors rather than short-circuiting (SPEC_FULL.md §4.3).
use ahash::{AHashMap, AHashSet};
use serde_json::Value;

use crate::{
    cast::CastStacks,
    format::FormatRegistry,
    key::{Key, Namespace},
    output::{Error, ErrorOrder, ValidationOutput},
    paths::{Chunk, DataPath, EvalPath, Location, SchemaPath},
    subschema::Compiled,
    vocabulary::SchemaRef,
};

/// One property name or array index that counted as "evaluated" at the current
/// object/array level (SPEC_FULL.md §4.3 "evaluated").
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum EvaluatedKey {
    Property(String),
    Index(usize),
}

impl From<&EvaluatedKey> for Chunk {
    fn from(key: &EvaluatedKey) -> Self {
        match key {
            EvaluatedKey::Property(name) => Chunk::from(name.clone()),
            EvaluatedKey::Index(idx) => Chunk::from(*idx),
        }
    }
}

/// All mutable state threaded through one `validate` call (SPEC_FULL.md §4.3 table).
pub struct ValidationContext<'v> {
    pub validators: &'v AHashMap<Key, Compiled>,
    pub formats: &'v FormatRegistry,
    pub data_path: DataPath,
    pub eval_path: EvalPath,
    pub schema_path: SchemaPath,
    pub scope: Vec<Namespace>,
    pub evaluated: Vec<AHashSet<EvaluatedKey>>,
    pub errors: Vec<Error>,
    pub cast_stacks: CastStacks,
    pub cast_enabled: bool,
}

impl<'v> ValidationContext<'v> {
    #[must_use]
    pub fn new(
        validators: &'v AHashMap<Key, Compiled>,
        formats: &'v FormatRegistry,
        root_ns: Namespace,
        cast_enabled: bool,
    ) -> Self {
        ValidationContext {
            validators,
            formats,
            data_path: Location::root(),
            eval_path: Location::root(),
            schema_path: Location::root(),
            scope: vec![root_ns],
            evaluated: vec![AHashSet::default()],
            errors: Vec::new(),
            cast_stacks: CastStacks::new(),
            cast_enabled,
        }
    }

    /// Dispatch on whatever `sub` ultimately names: an inline compiled schema, or a
    /// separately staged `Key`. Used by applicator keywords for every nested schema
    /// that isn't itself a `$ref`/`$dynamicRef`.
    pub fn validate_schema_ref(&mut self, data: &Value, sub: &SchemaRef) {
        match sub {
            SchemaRef::Inline(compiled) => self.validate_compiled(data, compiled),
            SchemaRef::Key(key) => {
                let validators = self.validators;
                if let Some(compiled) = validators.get(key) {
                    self.validate_compiled(data, compiled);
                }
            }
        }
    }

    /// Validate a compiled `Key`/`Subschema`/`BooleanSchema`, applying any cast the
    /// subschema carries once its validators finish without error.
    pub fn validate_compiled(&mut self, data: &Value, compiled: &Compiled) {
        match compiled {
            Compiled::Boolean(boolean) => {
                if !boolean.valid {
                    crate::vocabulary::emit(&mut self.errors, "boolean_schema", "schema is `false`", self);
                }
            }
            Compiled::Schema(sub) => {
                let path_key = self.data_path.to_string();
                self.cast_stacks.push(&path_key, sub.cast.clone().filter(|_| self.cast_enabled));
                let before = self.errors.len();
                for validator in &sub.validators {
                    validator.validate(data, self);
                }
                if self.errors.len() == before {
                    if let Some(cast) = self.cast_stacks.pop(&path_key) {
                        let casted = cast.apply(self.formats, data.clone());
                        self.cast_stacks.record(&path_key, casted);
                    }
                } else {
                    self.cast_stacks.pop(&path_key);
                }
            }
        }
    }

    /// Resolve a `$dynamicRef`'s target: the outermost `{dynamic_anchor, ns, name}`
    /// on the scope stack that exists in `validators`, else the static anchor with
    /// the same name in `fallback_ns` (SPEC_FULL.md §4.3 "Dynamic ref resolution").
    #[must_use]
    pub fn resolve_dynamic(&self, fallback_ns: &Namespace, name: &str) -> Key {
        for scope_ns in &self.scope {
            let candidate = Key::DynamicAnchor { ns: scope_ns.clone(), name: name.to_string() };
            if self.validators.contains_key(&candidate) {
                return candidate;
            }
        }
        Key::Anchor { ns: fallback_ns.clone(), name: name.to_string() }
    }

    /// Dereference a `$ref`/`$dynamicRef` target by `Key`, entering its namespace's
    /// scope and pushing `eval_marker` onto the evaluation path.
    pub fn validate_ref(&mut self, data: &Value, key: &Key, eval_marker: &'static str) {
        let validators = self.validators;
        let Some(compiled) = validators.get(key) else { return };
        let target_ns = key.namespace().clone();
        let push_scope = self.scope.last() != Some(&target_ns);
        if push_scope {
            self.scope.push(target_ns);
        }
        let saved_eval = self.eval_path.clone();
        self.eval_path = self.eval_path.push(Chunk::keyword(eval_marker));
        self.validate_compiled(data, compiled);
        self.eval_path = saved_eval;
        if push_scope {
            self.scope.pop();
        }
    }

    /// Descend into a named child of an object/array (SPEC_FULL.md §4.3
    /// `validate_in`): pushes `key` onto `data_path`, runs `sub` with a fresh
    /// `evaluated` frame, then - iff no error was produced - records `key` as
    /// evaluated in the surrounding frame.
    pub fn validate_in(&mut self, data: &Value, key: EvaluatedKey, sub: &SchemaRef) -> bool {
        let saved_data_path = self.data_path.clone();
        self.data_path = saved_data_path.push(&key);
        self.evaluated.push(AHashSet::default());
        let before = self.errors.len();
        self.validate_schema_ref(data, sub);
        let ok = self.errors.len() == before;
        self.evaluated.pop();
        self.data_path = saved_data_path;
        if ok {
            if let Some(top) = self.evaluated.last_mut() {
                top.insert(key);
            }
        }
        ok
    }

    /// Validate `data` again under a keyword-scope shift (`then`, `allOf[i]`, …):
    /// fresh `evaluated`/`cast_stacks` frames, merged back on success. Returns the
    /// errors produced (empty iff the sub-validation succeeded); the caller decides
    /// whether to keep, discard, or re-wrap them.
    pub fn validate_as(&mut self, data: &Value, sub: &SchemaRef) -> Vec<Error> {
        self.evaluated.push(AHashSet::default());
        let outer_cast = self.cast_stacks.detach();
        let before = self.errors.len();
        self.validate_schema_ref(data, sub);
        let produced = self.errors.split_off(before);
        let inner_cast = std::mem::replace(&mut self.cast_stacks, outer_cast);
        let child_evaluated = self.evaluated.pop().unwrap_or_default();
        if produced.is_empty() {
            self.cast_stacks.merge_tracked(inner_cast);
            if let Some(parent) = self.evaluated.last_mut() {
                parent.extend(child_evaluated);
            }
        }
        produced
    }

    /// Like [`Self::validate_as`] but never merges the `evaluated` set back, for
    /// keywords whose sub-validation must not count as evaluation (`not`, the
    /// rejected branches of `oneOf`/`anyOf`).
    pub fn validate_detach(&mut self, data: &Value, sub: &SchemaRef) -> Vec<Error> {
        self.evaluated.push(AHashSet::default());
        let outer_cast = self.cast_stacks.detach();
        let before = self.errors.len();
        self.validate_schema_ref(data, sub);
        let produced = self.errors.split_off(before);
        self.cast_stacks = outer_cast;
        self.evaluated.pop();
        produced
    }

    /// Iterate `items` without short-circuiting: every item is visited regardless of
    /// whether earlier items produced errors (SPEC_FULL.md §4.3 `reduce`).
    pub fn reduce<T>(&mut self, items: impl IntoIterator<Item = T>, mut f: impl FnMut(&mut Self, T)) {
        for item in items {
            f(self, item);
        }
    }

    /// The set of property names / indices evaluated so far at the current level.
    #[must_use]
    pub fn evaluated_here(&self) -> &AHashSet<EvaluatedKey> {
        self.evaluated.last().expect("evaluated stack is never empty")
    }
}

/// Entry point: validate `data` against the compiled root, producing the §6
/// normalized output shape.
#[must_use]
pub fn validate_root(
    data: &Value,
    validators: &AHashMap<Key, Compiled>,
    root_key: &Key,
    formats: &FormatRegistry,
    cast_enabled: bool,
    order: ErrorOrder,
) -> ValidationOutput {
    let Some(compiled) = validators.get(root_key) else {
        return ValidationOutput::ok();
    };
    let mut ctx = ValidationContext::new(validators, formats, root_key.namespace().clone(), cast_enabled);
    ctx.validate_compiled(data, compiled);
    ValidationOutput::from_errors(ctx.errors, order)
}

/// Entry point for `opts.cast`: validate, and on success reconstruct `data` with every
/// recorded cast spliced in at its data path (SPEC_FULL.md §4.6, §2 "caller invokes
/// ... result is either `{ok, cast_value}` or an error").
pub fn validate_and_cast(
    data: &Value,
    validators: &AHashMap<Key, Compiled>,
    root_key: &Key,
    formats: &FormatRegistry,
    order: ErrorOrder,
) -> Result<Value, ValidationOutput> {
    let Some(compiled) = validators.get(root_key) else {
        return Ok(data.clone());
    };
    let mut ctx = ValidationContext::new(validators, formats, root_key.namespace().clone(), true);
    ctx.validate_compiled(data, compiled);
    if !ctx.errors.is_empty() {
        return Err(ValidationOutput::from_errors(ctx.errors, order));
    }
    Ok(splice_casts(data, &Location::root(), ctx.cast_stacks.results()))
}

/// Rebuild `value` depth-first, substituting any path present in `results` with its
/// recorded cast value. A substituted node is not recursed into further - if an outer
/// path was cast, its (already-final) replacement value is what the caller gets.
fn splice_casts(value: &Value, path: &Location, results: &AHashMap<String, Value>) -> Value {
    if let Some(cast) = results.get(&path.to_string()) {
        return cast.clone();
    }
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), splice_casts(v, &path.push(k.clone()), results));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| splice_casts(v, &path.push(i), results))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subschema::BooleanSchema;

    #[test]
    fn false_schema_rejects_everything() {
        let mut validators = AHashMap::default();
        let key = Key::Root;
        validators.insert(
            key.clone(),
            Compiled::Boolean(BooleanSchema { valid: false, schema_path: Location::root() }),
        );
        let formats = FormatRegistry::with_builtins();
        let output = validate_root(&Value::Null, &validators, &key, &formats, false, ErrorOrder::Ascending);
        assert!(!output.valid);
        assert_eq!(output.details[0].errors[0].kind, "boolean_schema");
    }

    #[test]
    fn true_schema_accepts_everything() {
        let mut validators = AHashMap::default();
        let key = Key::Root;
        validators.insert(
            key.clone(),
            Compiled::Boolean(BooleanSchema { valid: true, schema_path: Location::root() }),
        );
        let formats = FormatRegistry::with_builtins();
        let output = validate_root(&Value::Null, &validators, &key, &formats, false, ErrorOrder::Ascending);
        assert!(output.valid);
    }
}
