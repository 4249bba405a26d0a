//! Assertion-only keywords with no nested schemas of their own (SPEC_FULL.md §4.2
//! "validation"): `type`, `enum`, `const`, the numeric/string/array/object size and
//! shape keywords, `required` and `dependentRequired`.
use fraction::{BigFraction, BigUint};
use jv_referencing::Draft;
use num_cmp::NumCmp;
use serde_json::{Map, Number, Value};

use crate::{
    error::BuildError,
    vocabulary::{emit, CompileCtx, CompiledVocabulary, VocabularyModule},
};

const PRIORITY: i32 = 10;

pub struct ValidationModule;

impl VocabularyModule for ValidationModule {
    fn id(&self) -> &'static str {
        "validation"
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn compile(
        &self,
        raw: &Map<String, Value>,
        ctx: &mut CompileCtx<'_>,
    ) -> Result<Option<Box<dyn CompiledVocabulary>>, BuildError> {
        let types = raw.get("type").map(|t| match t {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).map(String::from).collect(),
            _ => Vec::new(),
        });
        let compiled = CompiledValidation {
            types,
            enum_values: raw.get("enum").and_then(Value::as_array).cloned(),
            const_value: raw.get("const").cloned(),
            multiple_of: raw.get("multipleOf").and_then(Value::as_f64),
            minimum: raw.get("minimum").and_then(Value::as_number).cloned(),
            maximum: raw.get("maximum").and_then(Value::as_number).cloned(),
            exclusive_minimum: raw.get("exclusiveMinimum").and_then(Value::as_number).cloned(),
            exclusive_maximum: raw.get("exclusiveMaximum").and_then(Value::as_number).cloned(),
            min_length: raw.get("minLength").and_then(Value::as_u64),
            max_length: raw.get("maxLength").and_then(Value::as_u64),
            pattern: raw
                .get("pattern")
                .and_then(Value::as_str)
                .map(fancy_regex::Regex::new)
                .transpose()
                .map_err(|_| BuildError::invalid_sub_schema("pattern is not a valid regular expression"))?,
            min_items: raw.get("minItems").and_then(Value::as_u64),
            max_items: raw.get("maxItems").and_then(Value::as_u64),
            unique_items: raw.get("uniqueItems").and_then(Value::as_bool).unwrap_or(false),
            min_properties: raw.get("minProperties").and_then(Value::as_u64),
            max_properties: raw.get("maxProperties").and_then(Value::as_u64),
            required: raw
                .get("required")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).map(String::from).collect()),
            dependent_required: dependent_required(raw, ctx.draft),
        };
        if compiled.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(compiled)))
    }
}

struct CompiledValidation {
    types: Option<Vec<String>>,
    enum_values: Option<Vec<Value>>,
    const_value: Option<Value>,
    multiple_of: Option<f64>,
    minimum: Option<Number>,
    maximum: Option<Number>,
    exclusive_minimum: Option<Number>,
    exclusive_maximum: Option<Number>,
    min_length: Option<u64>,
    max_length: Option<u64>,
    pattern: Option<fancy_regex::Regex>,
    min_items: Option<u64>,
    max_items: Option<u64>,
    unique_items: bool,
    min_properties: Option<u64>,
    max_properties: Option<u64>,
    required: Option<Vec<String>>,
    dependent_required: Option<Vec<(String, Vec<String>)>>,
}

impl CompiledValidation {
    fn is_empty(&self) -> bool {
        self.types.is_none()
            && self.enum_values.is_none()
            && self.const_value.is_none()
            && self.multiple_of.is_none()
            && self.minimum.is_none()
            && self.maximum.is_none()
            && self.exclusive_minimum.is_none()
            && self.exclusive_maximum.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && self.min_items.is_none()
            && self.max_items.is_none()
            && !self.unique_items
            && self.min_properties.is_none()
            && self.max_properties.is_none()
            && self.required.is_none()
            && self.dependent_required.is_none()
    }
}

impl CompiledVocabulary for CompiledValidation {
    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn validate(&self, data: &Value, ctx: &mut crate::validator::ValidationContext<'_>) {
        if let Some(types) = &self.types {
            if !types.iter().any(|t| matches_type(t, data)) {
                emit(&mut ctx.errors, "type", format!("is not of type {}", types.join(" or ")), ctx);
            }
        }
        if let Some(values) = &self.enum_values {
            if !values.iter().any(|v| json_equal(v, data)) {
                emit(&mut ctx.errors, "enum", "is not one of the enumerated values", ctx);
            }
        }
        if let Some(expected) = &self.const_value {
            if !json_equal(expected, data) {
                emit(&mut ctx.errors, "const", "does not match the expected constant", ctx);
            }
        }
        if let Value::Number(n) = data {
            let item = n.as_f64().unwrap_or(f64::NAN);
            if let Some(multiple_of) = self.multiple_of {
                if !is_multiple_of(item, multiple_of) {
                    emit(&mut ctx.errors, "multipleOf", format!("is not a multiple of {multiple_of}"), ctx);
                }
            }
            if let Some(min) = &self.minimum {
                if num_lt(n, min) {
                    emit(&mut ctx.errors, "minimum", format!("is less than the minimum of {min}"), ctx);
                }
            }
            if let Some(max) = &self.maximum {
                if num_gt(n, max) {
                    emit(&mut ctx.errors, "maximum", format!("is greater than the maximum of {max}"), ctx);
                }
            }
            if let Some(min) = &self.exclusive_minimum {
                if !num_gt(n, min) {
                    emit(&mut ctx.errors, "exclusiveMinimum", format!("is not strictly greater than {min}"), ctx);
                }
            }
            if let Some(max) = &self.exclusive_maximum {
                if !num_lt(n, max) {
                    emit(&mut ctx.errors, "exclusiveMaximum", format!("is not strictly less than {max}"), ctx);
                }
            }
        }
        if let Value::String(s) = data {
            let len = s.chars().count() as u64;
            if let Some(min) = self.min_length {
                if len < min {
                    emit(&mut ctx.errors, "minLength", format!("is shorter than {min} characters"), ctx);
                }
            }
            if let Some(max) = self.max_length {
                if len > max {
                    emit(&mut ctx.errors, "maxLength", format!("is longer than {max} characters"), ctx);
                }
            }
            if let Some(pattern) = &self.pattern {
                if !pattern.is_match(s).unwrap_or(false) {
                    emit(&mut ctx.errors, "pattern", format!("does not match pattern '{}'", pattern.as_str()), ctx);
                }
            }
        }
        if let Value::Array(items) = data {
            let len = items.len() as u64;
            if let Some(min) = self.min_items {
                if len < min {
                    emit(&mut ctx.errors, "minItems", format!("has fewer than {min} items"), ctx);
                }
            }
            if let Some(max) = self.max_items {
                if len > max {
                    emit(&mut ctx.errors, "maxItems", format!("has more than {max} items"), ctx);
                }
            }
            if self.unique_items && !all_unique(items) {
                emit(&mut ctx.errors, "uniqueItems", "contains duplicate items", ctx);
            }
        }
        if let Value::Object(map) = data {
            let len = map.len() as u64;
            if let Some(min) = self.min_properties {
                if len < min {
                    emit(&mut ctx.errors, "minProperties", format!("has fewer than {min} properties"), ctx);
                }
            }
            if let Some(max) = self.max_properties {
                if len > max {
                    emit(&mut ctx.errors, "maxProperties", format!("has more than {max} properties"), ctx);
                }
            }
            if let Some(required) = &self.required {
                let missing: Vec<&str> = required.iter().filter(|k| !map.contains_key(*k)).map(String::as_str).collect();
                if !missing.is_empty() {
                    emit(&mut ctx.errors, "required", format!("is missing required properties: {}", missing.join(", ")), ctx);
                }
            }
            if let Some(dependent) = &self.dependent_required {
                for (trigger, needed) in dependent {
                    if !map.contains_key(trigger) {
                        continue;
                    }
                    let missing: Vec<&str> = needed.iter().filter(|k| !map.contains_key(*k)).map(String::as_str).collect();
                    if !missing.is_empty() {
                        emit(
                            &mut ctx.errors,
                            "dependentRequired",
                            format!("'{trigger}' requires properties: {}", missing.join(", ")),
                            ctx,
                        );
                    }
                }
            }
        }
    }
}

/// `dependentRequired` (2020-12), folded together with the array-valued entries of
/// Draft 7's combined `dependencies` keyword - both describe the same assertion.
fn dependent_required(raw: &Map<String, Value>, draft: Draft) -> Option<Vec<(String, Vec<String>)>> {
    let mut out: Vec<(String, Vec<String>)> = raw
        .get("dependentRequired")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let deps = v.as_array().map_or_else(Vec::new, |a| {
                        a.iter().filter_map(Value::as_str).map(String::from).collect()
                    });
                    (k.clone(), deps)
                })
                .collect()
        })
        .unwrap_or_default();
    if draft == Draft::Draft7 {
        if let Some(deps) = raw.get("dependencies").and_then(Value::as_object) {
            for (k, v) in deps {
                if let Some(arr) = v.as_array() {
                    out.push((k.clone(), arr.iter().filter_map(Value::as_str).map(String::from).collect()));
                }
            }
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// A JSON number in whichever of `i64`/`u64`/`f64` holds it without loss, so that
/// `minimum`/`maximum` comparisons stay exact for integers outside `f64`'s 53-bit
/// mantissa (e.g. `i64::MAX` vs `i64::MAX - 1`, which round to the same `f64`).
enum Repr {
    I(i64),
    U(u64),
    F(f64),
}

fn repr(n: &Number) -> Repr {
    if let Some(i) = n.as_i64() {
        Repr::I(i)
    } else if let Some(u) = n.as_u64() {
        Repr::U(u)
    } else {
        Repr::F(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn num_lt(item: &Number, limit: &Number) -> bool {
    match (repr(item), repr(limit)) {
        (Repr::I(a), Repr::I(b)) => NumCmp::num_lt(a, b),
        (Repr::I(a), Repr::U(b)) => NumCmp::num_lt(a, b),
        (Repr::I(a), Repr::F(b)) => NumCmp::num_lt(a, b),
        (Repr::U(a), Repr::I(b)) => NumCmp::num_lt(a, b),
        (Repr::U(a), Repr::U(b)) => NumCmp::num_lt(a, b),
        (Repr::U(a), Repr::F(b)) => NumCmp::num_lt(a, b),
        (Repr::F(a), Repr::I(b)) => NumCmp::num_lt(a, b),
        (Repr::F(a), Repr::U(b)) => NumCmp::num_lt(a, b),
        (Repr::F(a), Repr::F(b)) => NumCmp::num_lt(a, b),
    }
}

fn num_gt(item: &Number, limit: &Number) -> bool {
    match (repr(item), repr(limit)) {
        (Repr::I(a), Repr::I(b)) => NumCmp::num_gt(a, b),
        (Repr::I(a), Repr::U(b)) => NumCmp::num_gt(a, b),
        (Repr::I(a), Repr::F(b)) => NumCmp::num_gt(a, b),
        (Repr::U(a), Repr::I(b)) => NumCmp::num_gt(a, b),
        (Repr::U(a), Repr::U(b)) => NumCmp::num_gt(a, b),
        (Repr::U(a), Repr::F(b)) => NumCmp::num_gt(a, b),
        (Repr::F(a), Repr::I(b)) => NumCmp::num_gt(a, b),
        (Repr::F(a), Repr::U(b)) => NumCmp::num_gt(a, b),
        (Repr::F(a), Repr::F(b)) => NumCmp::num_gt(a, b),
    }
}

/// `integer`: any number whose fractional part is exactly zero, not just values
/// stored as a JSON integer literal (SPEC_FULL.md §4.2 "type").
fn matches_type(ty: &str, value: &Value) -> bool {
    match ty {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "integer" => is_integer(value),
        "number" => value.is_number(),
        "string" => value.is_string(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => false,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => true,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

/// JSON-level equality for `enum`/`const`: numbers compare by value regardless of
/// their `i64`/`u64`/`f64` representation, matching the JSON data model rather than
/// `serde_json::Value`'s stricter `PartialEq`.
pub(crate) fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b)),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|v2| json_equal(v, v2)))
        }
        _ => a == b,
    }
}

fn all_unique(items: &[Value]) -> bool {
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            if json_equal(a, b) {
                return false;
            }
        }
    }
    true
}

/// Mirrors `jsonschema`'s own `multiple_of` keyword: a plain float remainder check,
/// falling back to exact `BigFraction` division when the remainder underflows to
/// `NaN` (huge divisors, subnormal quotients).
fn is_multiple_of(item: f64, multiple_of: f64) -> bool {
    let remainder = (item / multiple_of) % 1.0;
    if remainder.is_nan() {
        let fraction = BigFraction::from(item) / BigFraction::from(multiple_of);
        fraction.denom().map_or(true, |denom| denom == &BigUint::from(1_u8))
    } else {
        remainder.abs() < f64::EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::{is_multiple_of, json_equal, matches_type, num_lt};
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn num_lt_distinguishes_adjacent_i64_max() {
        let limit = json!(i64::MAX).as_number().unwrap().clone();
        let item = json!(i64::MAX - 1).as_number().unwrap().clone();
        assert!(num_lt(&item, &limit));
    }

    #[test_case("integer", &json!(4), true)]
    #[test_case("integer", &json!(4.0), true)]
    #[test_case("integer", &json!(4.5), false)]
    #[test_case("number", &json!(4.5), true)]
    #[test_case("string", &json!("x"), true)]
    fn type_matching(ty: &str, value: &serde_json::Value, expected: bool) {
        assert_eq!(matches_type(ty, value), expected);
    }

    #[test]
    fn const_ignores_int_float_representation() {
        assert!(json_equal(&json!(1), &json!(1.0)));
    }

    #[test_case(1.0, 0.1, true)]
    #[test_case(1.0, 0.3, false)]
    #[test_case(9.0, 3.0, true)]
    fn multiple_of(item: f64, divisor: f64, expected: bool) {
        assert_eq!(is_multiple_of(item, divisor), expected);
    }
}
