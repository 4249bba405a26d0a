//! Meta-schemas for the two supported dialects.
//!
//! Unlike most of the resources a [`crate::Registry`] holds, these are baked into the
//! binary: every build must be able to resolve `$schema` without a network round-trip.
use once_cell::sync::Lazy;
use serde_json::{json, Value};

pub static DRAFT7: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": "http://json-schema.org/draft-07/schema#",
        "title": "Core schema meta-schema",
        "definitions": {
            "schemaArray": {
                "type": "array",
                "minItems": 1,
                "items": { "$ref": "#" }
            },
            "nonNegativeInteger": { "type": "integer", "minimum": 0 },
            "nonNegativeIntegerDefault0": {
                "allOf": [ { "$ref": "#/definitions/nonNegativeInteger" }, { "default": 0 } ]
            },
            "simpleTypes": {
                "enum": ["array", "boolean", "integer", "null", "number", "object", "string"]
            },
            "stringArray": {
                "type": "array",
                "items": { "type": "string" },
                "uniqueItems": true,
                "default": []
            }
        },
        "type": ["object", "boolean"]
    })
});

/// Draft 2020-12 carries its active vocabularies explicitly in `$vocabulary`; Draft 7
/// predates that keyword entirely, so its six-family vocabulary set is injected as a
/// fallback by [`crate::Draft::default_vocabularies`] rather than read from this document.
pub static DRAFT202012: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://json-schema.org/draft/2020-12/schema",
        "$dynamicAnchor": "meta",
        "title": "Core and Validation specifications meta-schema",
        "$vocabulary": {
            "https://json-schema.org/draft/2020-12/vocab/core": true,
            "https://json-schema.org/draft/2020-12/vocab/applicator": true,
            "https://json-schema.org/draft/2020-12/vocab/unevaluated": true,
            "https://json-schema.org/draft/2020-12/vocab/validation": true,
            "https://json-schema.org/draft/2020-12/vocab/meta-data": true,
            "https://json-schema.org/draft/2020-12/vocab/format-annotation": true,
            "https://json-schema.org/draft/2020-12/vocab/format-assertion": false,
            "https://json-schema.org/draft/2020-12/vocab/content": true
        },
        "type": ["object", "boolean"]
    })
});

pub(crate) static META_SCHEMAS: Lazy<[(&'static str, &'static Value); 2]> = Lazy::new(|| {
    [
        ("http://json-schema.org/draft-07/schema#", &*DRAFT7),
        ("https://json-schema.org/draft/2020-12/schema", &*DRAFT202012),
    ]
});
