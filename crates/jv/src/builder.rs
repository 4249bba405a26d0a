//! Compiles one raw schema document into `{Key -> Compiled}` (SPEC_FULL.md §3, §4.2).
use std::{collections::VecDeque, sync::Arc};

use ahash::{AHashMap, AHashSet};
use jv_referencing::Draft;
use serde_json::Value;

use crate::{
    error::BuildError,
    format::FormatRegistry,
    key::{Key, Namespace, Ref},
    options::BuilderOptions,
    paths::{Location, SchemaPath},
    resolver::Resolver,
    subschema::{BooleanSchema, Compiled, Subschema},
    vocabulary::{self, cast_vocab, CompileCtx, SchemaRef, VocabularyModule},
};

/// Single-use compiler: one `build` call turns one root schema document into the
/// `{Key -> Compiled}` map a `Validator` runs against (SPEC_FULL.md §3 "Builder").
/// The `Resolver` backing it fetches and scans documents lazily, as refs staged
/// during compilation demand them; `drain_queue` is the fixpoint loop that keeps
/// compiling newly-staged keys until none remain (SPEC_FULL.md §4.2 "Sub-schema
/// handling during compilation").
pub struct Builder {
    resolver: Resolver,
    modules: Vec<Arc<dyn VocabularyModule>>,
    vocabulary_overrides: AHashMap<String, Arc<dyn VocabularyModule>>,
    formats: FormatRegistry,
    cast: bool,
    content_assert: bool,
    queue: VecDeque<Key>,
    queued: AHashSet<Key>,
    compiled: AHashMap<Key, Compiled>,
}

impl Builder {
    #[must_use]
    pub fn new(options: BuilderOptions) -> Self {
        let default_draft = options.draft.unwrap_or_default();
        Builder {
            resolver: Resolver::new(options.backends, default_draft),
            modules: vocabulary::builtin_modules(),
            vocabulary_overrides: options.vocabulary_overrides,
            formats: options.formats,
            cast: options.cast,
            content_assert: options.content_assert,
            queue: VecDeque::new(),
            queued: AHashSet::default(),
            compiled: AHashMap::default(),
        }
    }

    /// Compile `schema` and everything it transitively references, returning the
    /// finished validator map plus the `Key` `schema` itself was compiled under.
    /// Takes `&mut self` rather than consuming it so callers that need the builder's
    /// `FormatRegistry` afterwards (see [`Self::into_formats`]) can still get at it;
    /// the single-use contract is by convention, not enforced by the type.
    ///
    /// # Errors
    /// Propagates any `BuildError` raised while scanning, resolving or compiling.
    pub fn build(&mut self, schema: &Value) -> Result<(AHashMap<Key, Compiled>, Key), BuildError> {
        self.resolver.put_cached(Namespace::Root, schema.clone())?;
        self.stage_key(Key::Root);
        self.drain_queue()?;
        Ok((std::mem::take(&mut self.compiled), Key::Root))
    }

    /// Reclaim the `FormatRegistry` `build` compiled against, for a caller (such as
    /// [`crate::Validator`]) that needs the same registry at validate time.
    #[must_use]
    pub(crate) fn into_formats(self) -> FormatRegistry {
        self.formats
    }

    #[must_use]
    pub(crate) fn cast_enabled(&self) -> bool {
        self.cast
    }

    #[must_use]
    pub(crate) fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    #[must_use]
    pub(crate) fn content_assert(&self) -> bool {
        self.content_assert
    }

    /// Enqueue `key` for compilation unless it is already compiled or pending.
    pub(crate) fn stage_key(&mut self, key: Key) {
        if self.compiled.contains_key(&key) || self.queued.contains(&key) {
            return;
        }
        self.queued.insert(key.clone());
        self.queue.push_back(key);
    }

    /// Stage every `$dynamicAnchor` sharing `key`'s name known to the resolver so
    /// far, so outermost-scope resolution at validate time has somewhere to land
    /// (SPEC_FULL.md §4.2 "Dynamic anchors"). Anchors discovered in documents
    /// fetched later in the build are not retroactively staged; this is a
    /// deliberate simplification, see DESIGN.md.
    pub(crate) fn stage_dynamic_all(&mut self, key: &Key) {
        if let Key::DynamicAnchor { name, .. } = key {
            let candidates: Vec<Key> = self.resolver.dynamic_anchors_named(name).collect();
            for candidate in candidates {
                self.stage_key(candidate);
            }
        }
    }

    /// Resolve a parsed `$ref`/`$dynamicRef` to the `Key` it targets.
    ///
    /// # Errors
    /// Propagates any `BuildError` raised while fetching or scanning `reference`'s
    /// namespace.
    pub(crate) fn resolve_ref(&mut self, reference: &Ref) -> Result<Key, BuildError> {
        self.resolver.resolve_ref(reference)
    }

    /// Compile (or stage, for `$id`-bearing) a nested raw schema found while
    /// compiling another schema.
    ///
    /// # Errors
    /// Propagates any `BuildError` raised while deriving `raw`'s namespace or
    /// compiling it.
    pub(crate) fn build_sub(
        &mut self,
        raw: &Value,
        ns: &Namespace,
        draft: Draft,
        schema_path: SchemaPath,
    ) -> Result<SchemaRef, BuildError> {
        if let Some(id) = raw.as_object().and_then(|m| m.get("$id")).and_then(Value::as_str) {
            let new_ns = ns.derive(id)?;
            let key = Key::for_namespace(&new_ns);
            self.stage_key(key.clone());
            return Ok(SchemaRef::Key(key));
        }
        let meta_uri = self.resolver.fetch_resolved(&Key::for_namespace(ns))?.meta_uri.clone();
        let compiled = self.compile_value(raw, ns, draft, &meta_uri, schema_path)?;
        Ok(SchemaRef::Inline(Arc::new(compiled)))
    }

    fn drain_queue(&mut self) -> Result<(), BuildError> {
        while let Some(key) = self.queue.pop_front() {
            self.queued.remove(&key);
            if self.compiled.contains_key(&key) {
                continue;
            }
            let compiled = self.compile_key(&key)?;
            self.compiled.insert(key, compiled);
        }
        Ok(())
    }

    fn compile_key(&mut self, key: &Key) -> Result<Compiled, BuildError> {
        let resolved = self.resolver.fetch_resolved(key)?.clone();
        // `Key::Root`'s `Resolved.ns` is always the anonymous root, even when the raw
        // document declares its own `$id` - relative `$ref`s inside it must still
        // resolve against that `$id`, not against the anonymous root (which can only
        // merge absolute references).
        let ns = if matches!(key, Key::Root) {
            match resolved.raw.as_object().and_then(|m| m.get("$id")).and_then(Value::as_str) {
                Some(id) => Namespace::Root.derive(id)?,
                None => resolved.ns.clone(),
            }
        } else {
            resolved.ns.clone()
        };
        self.compile_value(&resolved.raw, &ns, resolved.draft, &resolved.meta_uri, Location::root())
    }

    fn compile_value(
        &mut self,
        raw: &Value,
        ns: &Namespace,
        draft: Draft,
        meta_uri: &str,
        schema_path: SchemaPath,
    ) -> Result<Compiled, BuildError> {
        match raw {
            Value::Bool(valid) => Ok(Compiled::Boolean(BooleanSchema { valid: *valid, schema_path })),
            Value::Object(map) => {
                let modules = self.modules_for(meta_uri)?;
                let cast = if self.cast { cast_vocab::compile(map, &self.formats) } else { None };
                let skip_siblings = draft == Draft::Draft7 && map.contains_key("$ref");
                let mut validators = Vec::new();
                for module in &modules {
                    if skip_siblings && module.id() != "core" {
                        continue;
                    }
                    let mut ctx = CompileCtx {
                        builder: self,
                        schema_path: schema_path.clone(),
                        ns: ns.clone(),
                        draft,
                    };
                    if let Some(compiled) = module.compile(map, &mut ctx)? {
                        validators.push(compiled);
                    }
                }
                validators.sort_by_key(|v| v.priority());
                Ok(Compiled::Schema(Subschema { validators, schema_path, cast }))
            }
            other => Err(BuildError::invalid_sub_schema(other.clone())),
        }
    }

    /// The compiled modules a subschema governed by `meta_uri` runs, in builtin
    /// declaration order (sorted by priority once validators are produced).
    fn modules_for(&self, meta_uri: &str) -> Result<Vec<Arc<dyn VocabularyModule>>, BuildError> {
        let vocab_map = self.resolver.fetch_vocabulary(meta_uri)?;
        let ids = vocabulary::vocabulary_module_ids();
        let mut selected = Vec::new();
        for (uri, required) in &vocab_map {
            if let Some(module) = self.vocabulary_overrides.get(uri) {
                selected.push(module.clone());
                continue;
            }
            match ids.get(uri.as_str()) {
                Some(id) => {
                    if let Some(module) = self.modules.iter().find(|m| m.id() == *id) {
                        selected.push(module.clone());
                    } else if *required {
                        return Err(BuildError::unknown_vocabulary(uri.clone()));
                    }
                }
                None if *required => return Err(BuildError::undefined_vocabulary(uri.clone())),
                None => {}
            }
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::Builder;
    use crate::{options::BuilderOptions, subschema::Compiled};
    use serde_json::json;

    #[test]
    fn compiles_a_trivial_schema() {
        let schema = json!({"type": "string"});
        let (validators, root) = Builder::new(BuilderOptions::new()).build(&schema).unwrap();
        match validators.get(&root).unwrap() {
            Compiled::Schema(sub) => assert_eq!(sub.validators.len(), 1),
            Compiled::Boolean(_) => panic!("expected a Schema"),
        }
    }

    #[test]
    fn compiles_boolean_schemas() {
        let (validators, root) = Builder::new(BuilderOptions::new()).build(&json!(false)).unwrap();
        match validators.get(&root).unwrap() {
            Compiled::Boolean(b) => assert!(!b.valid),
            Compiled::Schema(_) => panic!("expected a Boolean"),
        }
    }

    #[test]
    fn stages_and_compiles_ref_targets() {
        let schema = json!({
            "$defs": { "pos": { "type": "integer", "minimum": 0 } },
            "$ref": "#/$defs/pos"
        });
        let (validators, root) = Builder::new(BuilderOptions::new()).build(&schema).unwrap();
        assert!(validators.len() >= 2, "root plus at least the $defs target should compile");
        assert!(validators.contains_key(&root));
    }
}
