//! Canonical identifiers: namespaces, parsed `$ref`/`$dynamicRef` strings, and the
//! `Key` every compiled validator is stored under.
use std::fmt;

use jv_referencing::{uri, Uri};

use crate::error::BuildError;

/// The canonical namespace of a schema document: either the anonymous root
/// document, or an absolute URI with its fragment stripped.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Namespace {
    Root,
    Uri(String),
}

impl Namespace {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Namespace::Root => "",
            Namespace::Uri(uri) => uri.as_str(),
        }
    }

    /// `derive(B, R)`: the namespace produced by following reference `reference`
    /// found while processing a document whose namespace is `self`.
    pub fn derive(&self, reference: &str) -> Result<Namespace, BuildError> {
        let (path_part, _fragment) = split_fragment(reference);

        // A pure `#fragment` reference never changes the namespace - RFC 3986
        // merge of a fragment-only reference always preserves the base's path.
        if path_part.is_empty() {
            return Ok(self.clone());
        }

        if let Ok(absolute) = uri::from_str(path_part) {
            if has_scheme(path_part) {
                return Ok(Namespace::Uri(strip_fragment(absolute.as_str())));
            }
        }

        match self {
            Namespace::Root => Err(BuildError::invalid_ns_merge(reference)),
            Namespace::Uri(base) => {
                let base_uri = Uri::parse(base.as_str())
                    .map_err(|_| BuildError::invalid_ns_merge(reference))?;
                let resolved = uri::resolve_against(&base_uri.borrow(), path_part)
                    .map_err(|_| BuildError::invalid_ns_merge(reference))?;
                Ok(Namespace::Uri(strip_fragment(resolved.as_str())))
            }
        }
    }
}

fn has_scheme(s: &str) -> bool {
    match s.find(':') {
        Some(idx) => s[..idx]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && s[..idx]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        None => false,
    }
}

fn split_fragment(s: &str) -> (&str, &str) {
    match s.split_once('#') {
        Some((path, fragment)) => (path, fragment),
        None => (s, ""),
    }
}

fn strip_fragment(s: &str) -> String {
    split_fragment(s).0.to_string()
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One segment of a JSON Pointer, already percent-decoded and `~0`/`~1`-unescaped.
/// Integer-looking segments are kept as integers so array indexing need not
/// re-parse them.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Segment {
    Property(String),
    Index(usize),
}

impl Segment {
    #[must_use]
    pub fn parse(raw: &str) -> Segment {
        let unescaped = unescape(raw);
        if is_array_index(&unescaped) {
            if let Ok(idx) = unescaped.parse::<usize>() {
                return Segment::Index(idx);
            }
        }
        Segment::Property(unescaped)
    }
}

fn is_array_index(s: &str) -> bool {
    !s.is_empty() && (s == "0" || !s.starts_with('0')) && s.chars().all(|c| c.is_ascii_digit())
}

fn unescape(raw: &str) -> String {
    let percent_decoded = percent_encoding::percent_decode_str(raw)
        .decode_utf8()
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    percent_decoded.replace("~1", "/").replace("~0", "~")
}

/// What kind of target a parsed `$ref`/`$dynamicRef` points at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RefKind {
    /// The document root itself (`"#"` or an external URI with no fragment/pointer).
    Top,
    /// A JSON Pointer into the document (`"#/properties/foo"`).
    Pointer(Vec<Segment>),
    /// A named anchor (`"#meta"`).
    Anchor(String),
}

/// A parsed `$ref`/`$dynamicRef` string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ref {
    pub ns: Namespace,
    pub kind: RefKind,
    pub dynamic: bool,
}

impl Ref {
    pub fn parse(base_ns: &Namespace, raw: &str, dynamic: bool) -> Result<Ref, BuildError> {
        let ns = base_ns.derive(raw)?;
        let (_, fragment) = split_fragment(raw);
        let kind = if fragment.is_empty() {
            RefKind::Top
        } else if let Some(pointer) = fragment.strip_prefix('/') {
            if pointer.is_empty() {
                RefKind::Pointer(Vec::new())
            } else {
                RefKind::Pointer(pointer.split('/').map(Segment::parse).collect())
            }
        } else {
            RefKind::Anchor(fragment.to_string())
        };
        Ok(Ref { ns, kind, dynamic })
    }

    #[must_use]
    pub fn as_key(&self) -> Key {
        match &self.kind {
            RefKind::Top => Key::for_namespace(&self.ns),
            RefKind::Pointer(segments) => Key::Pointer {
                ns: self.ns.clone(),
                segments: segments.clone(),
            },
            RefKind::Anchor(name) if self.dynamic => Key::DynamicAnchor {
                ns: self.ns.clone(),
                name: name.clone(),
            },
            RefKind::Anchor(name) => Key::Anchor {
                ns: self.ns.clone(),
                name: name.clone(),
            },
        }
    }
}

/// The canonical identifier of a resolved resource. All compiled validator
/// storage is keyed by `Key`; two refs that target the same resource share
/// the same `Key`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Key {
    /// The anonymous top document, before any namespace has been established.
    Root,
    /// A document's own root, addressed by its namespace.
    Namespace(Namespace),
    Pointer { ns: Namespace, segments: Vec<Segment> },
    Anchor { ns: Namespace, name: String },
    DynamicAnchor { ns: Namespace, name: String },
}

impl Key {
    /// The key a document's own root is stored under: the `root` sentinel for the
    /// anonymous top document, `{ns}` otherwise. Resolver and `Ref::as_key` must agree
    /// on this so a "#" ref inside the anonymous root document lands on the same key
    /// the root was scanned under.
    #[must_use]
    pub fn for_namespace(ns: &Namespace) -> Key {
        match ns {
            Namespace::Root => Key::Root,
            Namespace::Uri(_) => Key::Namespace(ns.clone()),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        static ROOT: Namespace = Namespace::Root;
        match self {
            Key::Root => &ROOT,
            Key::Namespace(ns) | Key::Pointer { ns, .. } | Key::Anchor { ns, .. } => ns,
            Key::DynamicAnchor { ns, .. } => ns,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Root => write!(f, "<root>"),
            Key::Namespace(ns) => write!(f, "{ns}"),
            Key::Pointer { ns, segments } => {
                write!(f, "{ns}#")?;
                for segment in segments {
                    match segment {
                        Segment::Property(p) => write!(f, "/{p}")?,
                        Segment::Index(i) => write!(f, "/{i}")?,
                    }
                }
                Ok(())
            }
            Key::Anchor { ns, name } => write!(f, "{ns}#{name}"),
            Key::DynamicAnchor { ns, name } => write!(f, "{ns}#{name} (dynamic)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Namespace, Segment};
    use test_case::test_case;

    #[test]
    fn root_derive_absolute() {
        let ns = Namespace::Root.derive("https://example.com/schema.json").unwrap();
        assert_eq!(ns, Namespace::Uri("https://example.com/schema.json".into()));
    }

    #[test]
    fn root_derive_relative_is_error() {
        assert!(Namespace::Root.derive("schema.json").is_err());
    }

    #[test]
    fn fragment_only_preserves_namespace() {
        let base = Namespace::Uri("https://example.com/schema.json".into());
        let derived = base.derive("#/definitions/foo").unwrap();
        assert_eq!(derived, base);
    }

    #[test]
    fn relative_resolves_against_base() {
        let base = Namespace::Uri("https://example.com/a/schema.json".into());
        let derived = base.derive("other.json").unwrap();
        assert_eq!(
            derived,
            Namespace::Uri("https://example.com/a/other.json".into())
        );
    }

    #[test]
    fn absolute_replaces_base() {
        let base = Namespace::Uri("https://example.com/a/schema.json".into());
        let derived = base.derive("https://other.example/schema.json#/x").unwrap();
        assert_eq!(
            derived,
            Namespace::Uri("https://other.example/schema.json".into())
        );
    }

    #[test_case("foo", Segment::Property("foo".into()))]
    #[test_case("0", Segment::Index(0))]
    #[test_case("01", Segment::Property("01".into()))]
    #[test_case("~0~1", Segment::Property("~/".into()))]
    fn segment_parse(raw: &str, expected: Segment) {
        assert_eq!(Segment::parse(raw), expected);
    }
}
