use serde_json::Value;

use crate::{specification::subresources, Error, Resolver, ResourceRef, Segments};

/// Iterator over Draft 7 subresources.
///
/// Draft 7 predates `prefixItems`/`$defs`/`unevaluated*`/`contentSchema`, so this walks
/// a smaller keyword set than the Draft 2020-12 iterator in `subresources.rs`.
enum LegacyIter<'a> {
    Empty,
    Single(std::iter::Once<&'a Value>),
    Array(std::slice::Iter<'a, Value>),
    Object(serde_json::map::Values<'a>),
    FilteredObject(std::iter::Filter<serde_json::map::Values<'a>, fn(&&Value) -> bool>),
}

impl<'a> LegacyIter<'a> {
    fn once(value: &'a Value) -> Self {
        LegacyIter::Single(std::iter::once(value))
    }
}

impl<'a> Iterator for LegacyIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            LegacyIter::Empty => None,
            LegacyIter::Single(iter) => iter.next(),
            LegacyIter::Array(iter) => iter.next(),
            LegacyIter::Object(iter) => iter.next(),
            LegacyIter::FilteredObject(iter) => iter.next(),
        }
    }
}

pub(crate) fn subresources_of(contents: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match contents.as_object() {
        Some(schema) => Box::new(schema.iter().flat_map(|(key, value)| match key.as_str() {
            "additionalItems"
            | "additionalProperties"
            | "contains"
            | "else"
            | "if"
            | "not"
            | "propertyNames"
            | "then" => LegacyIter::once(value),
            "allOf" | "anyOf" | "oneOf" => value
                .as_array()
                .map_or(LegacyIter::Empty, |arr| LegacyIter::Array(arr.iter())),
            "definitions" | "patternProperties" | "properties" => value
                .as_object()
                .map_or(LegacyIter::Empty, |obj| LegacyIter::Object(obj.values())),
            "items" => match value {
                Value::Array(arr) => LegacyIter::Array(arr.iter()),
                _ => LegacyIter::once(value),
            },
            "dependencies" => value.as_object().map_or(LegacyIter::Empty, |deps| {
                LegacyIter::FilteredObject(deps.values().filter(|v| v.is_object()))
            }),
            _ => LegacyIter::Empty,
        })),
        None => Box::new(std::iter::empty()),
    }
}

pub(crate) fn maybe_in_subresource<'r>(
    segments: &Segments,
    resolver: &Resolver<'r>,
    subresource: ResourceRef<'r>,
) -> Result<Resolver<'r>, Error> {
    const IN_VALUE: &[&str] = &[
        "additionalItems",
        "additionalProperties",
        "contains",
        "else",
        "if",
        "not",
        "propertyNames",
        "then",
    ];
    const IN_CHILD: &[&str] = &[
        "allOf",
        "anyOf",
        "oneOf",
        "definitions",
        "patternProperties",
        "properties",
    ];
    subresources::maybe_in_subresource_with_items_and_dependencies(
        segments,
        resolver,
        subresource,
        IN_VALUE,
        IN_CHILD,
    )
}
