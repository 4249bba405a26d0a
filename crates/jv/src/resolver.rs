//! Fetch, scan and cache schema documents under the `Key`/`Ref` addressing scheme of
//! SPEC_FULL.md §4.1.
//!
//! This crate does its own scanning rather than reusing `jv_referencing::Registry`
//! wholesale: the registry's cache is keyed by raw URI plus a separate anchor map, with
//! no notion of `Key`/`Alias`, and its internals are private to that crate. What it
//! *does* supply, and what this module leans on: `Draft::detect` for `$schema`
//! dispatch, the `Retrieve` trait for pluggable backends, and the two baked-in
//! meta-schema documents in `jv_referencing::meta`.
use ahash::{AHashMap, AHashSet};
use jv_referencing::{meta, uri, Draft, Retrieve};
use serde_json::Value;

use crate::{
    error::BuildError,
    key::{Key, Namespace, Ref, RefKind, Segment},
};

/// One addressable, compiled-from-later resource: its raw content plus the bookkeeping
/// the `Builder` needs (SPEC_FULL.md §3 "Resolved entry").
#[derive(Debug, Clone)]
pub struct Resolved {
    pub raw: Value,
    pub meta_uri: String,
    pub ns: Namespace,
    pub parent_ns: Namespace,
    pub draft: Draft,
}

#[derive(Debug, Clone)]
enum Entry {
    Resolved(Resolved),
    Alias(Key),
}

/// Single-use (one root schema) fetch-and-scan cache, keyed by `Key`.
pub struct Resolver {
    backends: Vec<Box<dyn Retrieve>>,
    default_draft: Draft,
    entries: AHashMap<Key, Entry>,
    fetched_docs: AHashSet<Namespace>,
}

impl Resolver {
    #[must_use]
    pub fn new(backends: Vec<Box<dyn Retrieve>>, default_draft: Draft) -> Self {
        Resolver {
            backends,
            default_draft,
            entries: AHashMap::default(),
            fetched_docs: AHashSet::default(),
        }
    }

    /// Inject a pre-fetched document as the contents of `ns`, without going through the
    /// backend chain. Used for the root schema the caller hands to `Builder::build!`.
    pub fn put_cached(&mut self, ns: Namespace, raw: Value) -> Result<(), BuildError> {
        if self.fetched_docs.contains(&ns) {
            return Ok(());
        }
        self.fetched_docs.insert(ns.clone());
        self.scan_document(ns, raw)
    }

    /// Ensure `ns` has been fetched and scanned. Idempotent.
    pub fn resolve_ns(&mut self, ns: &Namespace) -> Result<(), BuildError> {
        if self.fetched_docs.contains(ns) || matches!(ns, Namespace::Root) {
            return Ok(());
        }
        let raw = self.fetch_raw(ns)?;
        self.fetched_docs.insert(ns.clone());
        self.scan_document(ns.clone(), raw)
    }

    /// Resolve a parsed `Ref` to the `Key` it targets, fetching/scanning its namespace
    /// first if needed, and (for pointer refs) synthesizing the pointer's cache entry.
    pub fn resolve_ref(&mut self, reference: &Ref) -> Result<Key, BuildError> {
        self.resolve_ns(&reference.ns)?;
        let key = reference.as_key();
        if let RefKind::Pointer(segments) = &reference.kind {
            self.ensure_pointer(&reference.ns, segments)?;
        }
        Ok(key)
    }

    /// Fetch the non-alias entry for `key`, dereferencing one alias hop.
    pub fn fetch_resolved(&self, key: &Key) -> Result<&Resolved, BuildError> {
        match self.entries.get(key) {
            Some(Entry::Resolved(resolved)) => Ok(resolved),
            Some(Entry::Alias(target)) => match self.entries.get(target) {
                Some(Entry::Resolved(resolved)) => Ok(resolved),
                _ => Err(BuildError::unresolved(key.to_string())),
            },
            None => Err(BuildError::unresolved(key.to_string())),
        }
    }

    /// All `{dynamic_anchor, ns, name}` keys currently known with this `name`, used to
    /// stage every candidate target of a `$dynamicRef` (SPEC_FULL.md §4.2).
    pub fn dynamic_anchors_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Key> + 'a {
        self.entries.keys().filter_map(move |key| match key {
            Key::DynamicAnchor { name: n, .. } if n == name => Some(key.clone()),
            _ => None,
        })
    }

    /// `$vocabulary` map for a meta-schema, `{uri -> required?}`. Draft 7 has no
    /// `$vocabulary` keyword of its own; a synthetic six-family fallback is used.
    pub fn fetch_vocabulary(&self, meta_uri: &str) -> Result<AHashMap<String, bool>, BuildError> {
        let trimmed = meta_uri.trim_end_matches('#');
        let draft202012_id = meta::DRAFT202012.get("$id").and_then(Value::as_str).unwrap_or_default();
        let draft7_id = meta::DRAFT7
            .get("$id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim_end_matches('#');

        if trimmed == draft202012_id {
            let map = meta::DRAFT202012
                .get("$vocabulary")
                .and_then(Value::as_object)
                .ok_or_else(|| BuildError::undefined_vocabulary(meta_uri))?;
            Ok(map
                .iter()
                .map(|(k, v)| (k.clone(), v.as_bool().unwrap_or(false)))
                .collect())
        } else if trimmed == draft7_id {
            Ok(draft7_fallback_vocabulary())
        } else {
            Err(BuildError::undefined_vocabulary(meta_uri))
        }
    }

    fn fetch_raw(&self, ns: &Namespace) -> Result<Value, BuildError> {
        let Namespace::Uri(uri_str) = ns else {
            return Err(BuildError::unresolved("<root>"));
        };
        let parsed = uri::from_str(uri_str).map_err(|e| {
            BuildError::resolver_error(vec![("uri".to_string(), e.to_string())])
        })?;
        let mut reasons = Vec::new();
        for (idx, backend) in self.backends.iter().enumerate() {
            match backend.retrieve(&parsed.borrow()) {
                Ok(value) => return Ok(value),
                Err(e) => reasons.push((format!("backend[{idx}]"), e.to_string())),
            }
        }
        Err(BuildError::resolver_error(reasons))
    }

    fn scan_document(&mut self, ns: Namespace, raw: Value) -> Result<(), BuildError> {
        if matches!(&raw, Value::Bool(_)) {
            return Err(BuildError::invalid_sub_schema("boolean schema at document root"));
        }
        let draft = self
            .default_draft
            .detect(&raw)
            .map_err(|e| BuildError::resolver_error(vec![("draft".to_string(), e.to_string())]))?;
        let meta_uri = raw
            .as_object()
            .and_then(|o| o.get("$schema"))
            .and_then(Value::as_str)
            .map(|s| s.trim_end_matches('#').to_string())
            .unwrap_or_else(|| default_meta_uri(draft).to_string());
        self.insert_resolved(Key::for_namespace(&ns), Entry::Resolved(Resolved {
            raw: raw.clone(),
            meta_uri: meta_uri.clone(),
            ns: ns.clone(),
            parent_ns: ns.clone(),
            draft,
        }))?;
        self.descend(&raw, &ns, &ns, Vec::new(), &meta_uri, draft)?;
        self.resolve_meta_chain(&meta_uri)?;
        Ok(())
    }

    fn resolve_meta_chain(&mut self, meta_uri: &str) -> Result<(), BuildError> {
        // Both supported dialects' meta-schemas are baked in; this just confirms the
        // URI is one we recognize (§4.1 "Meta loop").
        self.fetch_vocabulary(meta_uri).map(|_| ())
    }

    /// Recursively walk `value`'s applicator keywords, registering `$id`/`$anchor`/
    /// `$dynamicAnchor` aliases as they're found. `doc_ns` is the nearest enclosing
    /// namespace whose root document can be pointer-walked to reach `value`; `path`
    /// are the segments from that root to `value`.
    fn descend(
        &mut self,
        value: &Value,
        doc_ns: &Namespace,
        parent_ns: &Namespace,
        path: Vec<Segment>,
        meta_uri: &str,
        draft: Draft,
    ) -> Result<(), BuildError> {
        let Some(object) = value.as_object() else { return Ok(()) };

        let mut doc_ns = doc_ns.clone();
        let mut path = path;
        let mut parent_ns = parent_ns.clone();

        if let Some(id) = object.get("$id").and_then(Value::as_str) {
            if let Some(name) = id.strip_prefix('#') {
                self.alias_to(Key::Anchor { ns: doc_ns.clone(), name: name.to_string() }, &doc_ns, &path)?;
            } else {
                let new_ns = doc_ns.derive(id)?;
                parent_ns = doc_ns.clone();
                self.insert_resolved(Key::for_namespace(&new_ns), Entry::Resolved(Resolved {
                    raw: value.clone(),
                    meta_uri: meta_uri.to_string(),
                    ns: new_ns.clone(),
                    parent_ns: parent_ns.clone(),
                    draft,
                }))?;
                doc_ns = new_ns;
                path = Vec::new();
            }
        }
        if let Some(name) = object.get("$anchor").and_then(Value::as_str) {
            self.alias_to(Key::Anchor { ns: doc_ns.clone(), name: name.to_string() }, &doc_ns, &path)?;
        }
        if let Some(name) = object.get("$dynamicAnchor").and_then(Value::as_str) {
            self.alias_to(Key::DynamicAnchor { ns: doc_ns.clone(), name: name.to_string() }, &doc_ns, &path)?;
        }

        for (segment, child) in subschema_children(object, draft) {
            let mut child_path = path.clone();
            child_path.extend(segment);
            self.descend(child, &doc_ns, &parent_ns, child_path, meta_uri, draft)?;
        }
        Ok(())
    }

    fn alias_to(&mut self, alias_key: Key, doc_ns: &Namespace, path: &[Segment]) -> Result<(), BuildError> {
        let target = if path.is_empty() {
            Key::for_namespace(doc_ns)
        } else {
            Key::Pointer { ns: doc_ns.clone(), segments: path.to_vec() }
        };
        self.insert_resolved(alias_key, Entry::Alias(target))
    }

    fn insert_resolved(&mut self, key: Key, entry: Entry) -> Result<(), BuildError> {
        match (self.entries.get(&key), &entry) {
            (Some(Entry::Resolved(existing)), Entry::Resolved(incoming))
                if existing.raw != incoming.raw =>
            {
                Err(BuildError::duplicate_resolution(key))
            }
            (Some(_), _) => Ok(()),
            (None, _) => {
                self.entries.insert(key, entry);
                Ok(())
            }
        }
    }

    /// Synthesize a `Resolved` cache entry for a `{pointer, ns, segments}` key by
    /// walking `segments` through `ns`'s root document.
    fn ensure_pointer(&mut self, ns: &Namespace, segments: &[Segment]) -> Result<(), BuildError> {
        let key = Key::Pointer { ns: ns.clone(), segments: segments.to_vec() };
        if self.entries.contains_key(&key) {
            return Ok(());
        }
        let root = self.fetch_resolved(&Key::for_namespace(ns))?.clone();
        let mut current = &root.raw;
        for segment in segments {
            current = match (segment, current) {
                (Segment::Property(name), Value::Object(map)) => map
                    .get(name)
                    .ok_or_else(|| BuildError::pointer_error(format_pointer(segments)))?,
                (Segment::Index(idx), Value::Array(items)) => items
                    .get(*idx)
                    .ok_or_else(|| BuildError::pointer_error(format_pointer(segments)))?,
                _ => return Err(BuildError::pointer_error(format_pointer(segments))),
            };
        }
        self.insert_resolved(key, Entry::Resolved(Resolved {
            raw: current.clone(),
            meta_uri: root.meta_uri.clone(),
            ns: ns.clone(),
            parent_ns: root.parent_ns.clone(),
            draft: root.draft,
        }))
    }
}

fn format_pointer(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        match segment {
            Segment::Property(p) => out.push_str(p),
            Segment::Index(i) => out.push_str(&i.to_string()),
        }
    }
    out
}

fn default_meta_uri(draft: Draft) -> &'static str {
    match draft {
        Draft::Draft7 => "http://json-schema.org/draft-07/schema",
        Draft::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
    }
}

fn draft7_fallback_vocabulary() -> AHashMap<String, bool> {
    [
        ("https://json-schema.org/draft/2020-12/vocab/core", true),
        ("https://json-schema.org/draft/2020-12/vocab/applicator", true),
        ("https://json-schema.org/draft/2020-12/vocab/validation", true),
        ("https://json-schema.org/draft/2020-12/vocab/meta-data", true),
        ("https://json-schema.org/draft/2020-12/vocab/format-annotation", true),
        ("https://json-schema.org/draft/2020-12/vocab/content", true),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// `(path segment(s), value)` pairs for every applicator keyword's subschema(s), per
/// the keyword lists in `jsonschema-referencing`'s `specification/{draft7,subresources}.rs`
/// (enum/const are never descended into).
fn subschema_children(
    object: &serde_json::Map<String, Value>,
    draft: Draft,
) -> Vec<(Vec<Segment>, &Value)> {
    let mut out = Vec::new();
    let single: &[&str] = match draft {
        Draft::Draft7 => &["additionalItems", "additionalProperties", "contains", "else", "if", "not", "propertyNames", "then"],
        Draft::Draft202012 => &[
            "additionalProperties", "contains", "contentSchema", "else", "if", "not", "propertyNames", "then",
            "unevaluatedItems", "unevaluatedProperties",
        ],
    };
    for &keyword in single {
        if let Some(v) = object.get(keyword) {
            out.push((vec![Segment::Property(keyword.to_string())], v));
        }
    }

    let arrays: &[&str] = match draft {
        Draft::Draft7 => &["allOf", "anyOf", "oneOf"],
        Draft::Draft202012 => &["allOf", "anyOf", "oneOf", "prefixItems"],
    };
    for &keyword in arrays {
        if let Some(items) = object.get(keyword).and_then(Value::as_array) {
            for (idx, item) in items.iter().enumerate() {
                out.push((vec![Segment::Property(keyword.to_string()), Segment::Index(idx)], item));
            }
        }
    }

    let map_keywords: &[&str] = match draft {
        Draft::Draft7 => &["definitions", "patternProperties", "properties"],
        Draft::Draft202012 => &["$defs", "definitions", "dependentSchemas", "patternProperties", "properties"],
    };
    for &keyword in map_keywords {
        if let Some(map) = object.get(keyword).and_then(Value::as_object) {
            for (name, v) in map {
                out.push((vec![Segment::Property(keyword.to_string()), Segment::Property(name.clone())], v));
            }
        }
    }

    // `items`: a single schema in 2020-12; in Draft 7 either a single schema or an
    // array of schemas (the `prefixItems` shape, kept under `items` for that draft).
    if let Some(items) = object.get("items") {
        match items {
            Value::Array(arr) if draft == Draft::Draft7 => {
                for (idx, item) in arr.iter().enumerate() {
                    out.push((vec![Segment::Property("items".to_string()), Segment::Index(idx)], item));
                }
            }
            _ => out.push((vec![Segment::Property("items".to_string())], items)),
        }
    }

    // Draft 7 `dependencies`: schema-valued entries only (string-array entries are
    // `dependentRequired`-shaped, not subschemas).
    if draft == Draft::Draft7 {
        if let Some(deps) = object.get("dependencies").and_then(Value::as_object) {
            for (name, v) in deps {
                if v.is_object() {
                    out.push((vec![Segment::Property("dependencies".to_string()), Segment::Property(name.clone())], v));
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::Resolver;
    use crate::key::{Key, Namespace, Ref};
    use jv_referencing::Draft;
    use serde_json::json;

    #[test]
    fn scans_nested_id_and_anchor() {
        let mut resolver = Resolver::new(Vec::new(), Draft::Draft202012);
        let ns = Namespace::Uri("https://example.com/schema.json".to_string());
        let raw = json!({
            "$id": "https://example.com/schema.json",
            "$defs": {
                "positive": { "$id": "positive.json", "$anchor": "pos", "type": "integer", "minimum": 0 }
            },
            "$ref": "#/$defs/positive"
        });
        resolver.put_cached(ns.clone(), raw).unwrap();

        let sub_ns = Namespace::Uri("https://example.com/positive.json".to_string());
        let resolved = resolver.fetch_resolved(&Key::Namespace(sub_ns.clone())).unwrap();
        assert_eq!(resolved.raw["type"], "integer");

        let by_anchor = resolver
            .fetch_resolved(&Key::Anchor { ns: sub_ns, name: "pos".to_string() })
            .unwrap();
        assert_eq!(by_anchor.raw["minimum"], 0);
    }

    #[test]
    fn duplicate_identical_content_is_tolerated() {
        let mut resolver = Resolver::new(Vec::new(), Draft::Draft202012);
        let ns = Namespace::Uri("https://example.com/schema.json".to_string());
        let raw = json!({"$id": "https://example.com/schema.json", "type": "string"});
        resolver.put_cached(ns.clone(), raw.clone()).unwrap();
        assert!(resolver.put_cached(ns, raw).is_ok());
    }

    #[test]
    fn resolves_pointer_ref() {
        let mut resolver = Resolver::new(Vec::new(), Draft::Draft202012);
        let ns = Namespace::Uri("https://example.com/schema.json".to_string());
        let raw = json!({
            "$id": "https://example.com/schema.json",
            "properties": { "name": { "type": "string" } }
        });
        resolver.put_cached(ns.clone(), raw).unwrap();
        let reference = Ref::parse(&ns, "#/properties/name", false).unwrap();
        let key = resolver.resolve_ref(&reference).unwrap();
        let resolved = resolver.fetch_resolved(&key).unwrap();
        assert_eq!(resolved.raw["type"], "string");
    }
}
