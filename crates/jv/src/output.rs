//! The flat error list accumulated during a run, and the grouped, JSON-encodable
//! shape it collapses into (SPEC_FULL.md §4.7, §6).
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::paths::Location;

/// One validation failure, as emitted by a vocabulary module. Never dropped except
/// in the three narrowly-scoped places the keyword semantics call for (`if`, `not`,
/// rejected `oneOf`/`anyOf` branches) - and even there the caller decides to discard,
/// this type itself never discards anything on its own.
#[derive(Clone, Debug)]
pub struct Error {
    pub kind: &'static str,
    pub message: String,
    pub data_path: Location,
    pub eval_path: Location,
    pub schema_path: Location,
    pub details: Vec<Error>,
}

impl Error {
    #[must_use]
    pub fn new(
        kind: &'static str,
        message: impl Into<String>,
        data_path: Location,
        eval_path: Location,
        schema_path: Location,
    ) -> Self {
        Error {
            kind,
            message: message.into(),
            data_path,
            eval_path,
            schema_path,
            details: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Vec<Error>) -> Self {
        self.details = details;
        self
    }
}

/// Whether errors are grouped in the order instance paths were first seen
/// (ascending) or last seen (descending). Exposed via `Options::error_order`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ErrorOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Serialize)]
pub struct OutputError {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<OutputError>,
}

impl From<Error> for OutputError {
    fn from(err: Error) -> Self {
        OutputError {
            kind: err.kind,
            message: err.message,
            details: err.details.into_iter().map(OutputError::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct OutputUnit {
    pub valid: bool,
    #[serde(rename = "instanceLocation")]
    pub instance_location: String,
    #[serde(rename = "evaluationPath")]
    pub evaluation_path: String,
    #[serde(rename = "schemaLocation")]
    pub schema_location: String,
    pub errors: Vec<OutputError>,
}

#[derive(Serialize)]
pub struct ValidationOutput {
    pub valid: bool,
    pub details: Vec<OutputUnit>,
}

impl ValidationOutput {
    #[must_use]
    pub fn ok() -> Self {
        ValidationOutput { valid: true, details: Vec::new() }
    }

    /// Flatten, group by `(data_path, eval_path, schema_path)` and sort per `order`.
    #[must_use]
    pub fn from_errors(errors: Vec<Error>, order: ErrorOrder) -> Self {
        if errors.is_empty() {
            return Self::ok();
        }
        let mut groups: BTreeMap<(String, String, String), (Location, Location, Location, Vec<Error>)> =
            BTreeMap::new();
        for error in errors {
            let key = (
                error.data_path.to_string(),
                error.eval_path.to_string(),
                error.schema_path.to_string(),
            );
            groups
                .entry(key)
                .or_insert_with(|| {
                    (
                        error.data_path.clone(),
                        error.eval_path.clone(),
                        error.schema_path.clone(),
                        Vec::new(),
                    )
                })
                .3
                .push(error);
        }
        let mut details: Vec<OutputUnit> = groups
            .into_values()
            .map(|(data_path, eval_path, schema_path, errors)| OutputUnit {
                valid: false,
                instance_location: format!("#{data_path}"),
                evaluation_path: format!("#{eval_path}"),
                schema_location: format!("#{schema_path}"),
                errors: errors.into_iter().map(OutputError::from).collect(),
            })
            .collect();
        if order == ErrorOrder::Descending {
            details.reverse();
        }
        ValidationOutput { valid: false, details }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).expect("ValidationOutput always serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorOrder, ValidationOutput};
    use crate::paths::Location;

    #[test]
    fn ok_output_has_no_details() {
        let output = ValidationOutput::ok();
        assert!(output.valid);
        assert!(output.details.is_empty());
    }

    #[test]
    fn groups_errors_by_location_triple() {
        let root = Location::root();
        let a = Error::new("type", "not a string", root.push("a"), root.push("properties").push("a"), root.push("properties").push("a"));
        let b = Error::new("minimum", "too small", root.push("a"), root.push("properties").push("a"), root.push("properties").push("a"));
        let output = ValidationOutput::from_errors(vec![a, b], ErrorOrder::Ascending);
        assert!(!output.valid);
        assert_eq!(output.details.len(), 1);
        assert_eq!(output.details[0].errors.len(), 2);
        assert_eq!(output.details[0].instance_location, "#/a");
    }
}
