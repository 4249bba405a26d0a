//! Build-time failures. Validation-time failures (accumulated, never fatal) live in
//! [`crate::output`].
use std::{error, fmt};

use crate::paths::Location;

/// Why compilation aborted. Matches the taxonomy in SPEC_FULL.md §7.
#[derive(Debug)]
pub enum BuildErrorReason {
    InvalidSubSchema { value: String },
    InvalidNsMerge { reference: String },
    UnknownVocabulary { uri: String },
    UndefinedVocabulary { uri: String },
    ResolverError { per_backend: Vec<(String, String)> },
    DuplicateResolution { key: String },
    KeyExists { key: String },
    Unresolved { reference: String },
    PointerError { pointer: String },
    InvalidDocpath { path: String },
    BadReturnFromVocabulary { module: &'static str, keyword: String },
}

impl fmt::Display for BuildErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildErrorReason::InvalidSubSchema { value } => {
                write!(f, "invalid sub-schema: {value}")
            }
            BuildErrorReason::InvalidNsMerge { reference } => {
                write!(f, "cannot derive a namespace for reference '{reference}'")
            }
            BuildErrorReason::UnknownVocabulary { uri } => {
                write!(f, "no implementation registered for vocabulary '{uri}'")
            }
            BuildErrorReason::UndefinedVocabulary { uri } => {
                write!(f, "required vocabulary '{uri}' is not known to the builder")
            }
            BuildErrorReason::ResolverError { per_backend } => {
                write!(f, "no resolver backend could fetch the resource: ")?;
                for (i, (backend, reason)) in per_backend.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{backend}: {reason}")?;
                }
                Ok(())
            }
            BuildErrorReason::DuplicateResolution { key } => {
                write!(f, "'{key}' resolves to two different, non-identical contents")
            }
            BuildErrorReason::KeyExists { key } => {
                write!(f, "a validator already exists for key '{key}'")
            }
            BuildErrorReason::Unresolved { reference } => {
                write!(f, "reference '{reference}' could not be resolved")
            }
            BuildErrorReason::PointerError { pointer } => {
                write!(f, "JSON Pointer '{pointer}' does not resolve within its document")
            }
            BuildErrorReason::InvalidDocpath { path } => {
                write!(f, "invalid document path '{path}'")
            }
            BuildErrorReason::BadReturnFromVocabulary { module, keyword } => {
                write!(f, "vocabulary module '{module}' returned an invalid value for keyword '{keyword}'")
            }
        }
    }
}

/// A fatal, build-time error: `{reason, action, build_path}`.
#[derive(Debug)]
pub struct BuildError {
    reason: BuildErrorReason,
    action: &'static str,
    build_path: Location,
    source: Option<Box<dyn error::Error + Send + Sync + 'static>>,
}

impl BuildError {
    fn new(reason: BuildErrorReason, action: &'static str) -> Self {
        BuildError {
            reason,
            action,
            build_path: Location::root(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: Location) -> Self {
        self.build_path = path;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn reason(&self) -> &BuildErrorReason {
        &self.reason
    }

    #[must_use]
    pub fn build_path(&self) -> &Location {
        &self.build_path
    }

    pub(crate) fn invalid_sub_schema(value: impl fmt::Debug) -> Self {
        Self::new(
            BuildErrorReason::InvalidSubSchema { value: format!("{value:?}") },
            "compiling a sub-schema",
        )
    }

    pub(crate) fn invalid_ns_merge(reference: impl Into<String>) -> Self {
        Self::new(
            BuildErrorReason::InvalidNsMerge { reference: reference.into() },
            "deriving a namespace",
        )
    }

    pub(crate) fn unknown_vocabulary(uri: impl Into<String>) -> Self {
        Self::new(
            BuildErrorReason::UnknownVocabulary { uri: uri.into() },
            "resolving a vocabulary override",
        )
    }

    pub(crate) fn undefined_vocabulary(uri: impl Into<String>) -> Self {
        Self::new(
            BuildErrorReason::UndefinedVocabulary { uri: uri.into() },
            "checking required vocabularies",
        )
    }

    pub(crate) fn resolver_error(per_backend: Vec<(String, String)>) -> Self {
        Self::new(BuildErrorReason::ResolverError { per_backend }, "fetching a resource")
    }

    pub(crate) fn duplicate_resolution(key: impl fmt::Display) -> Self {
        Self::new(
            BuildErrorReason::DuplicateResolution { key: key.to_string() },
            "registering an alias",
        )
    }

    pub(crate) fn key_exists(key: impl fmt::Display) -> Self {
        Self::new(BuildErrorReason::KeyExists { key: key.to_string() }, "staging a key")
    }

    pub(crate) fn unresolved(reference: impl Into<String>) -> Self {
        Self::new(
            BuildErrorReason::Unresolved { reference: reference.into() },
            "dereferencing a $ref",
        )
    }

    pub(crate) fn pointer_error(pointer: impl Into<String>) -> Self {
        Self::new(BuildErrorReason::PointerError { pointer: pointer.into() }, "walking a JSON Pointer")
    }

    pub(crate) fn invalid_docpath(path: impl Into<String>) -> Self {
        Self::new(BuildErrorReason::InvalidDocpath { path: path.into() }, "resolving a document path")
    }

    pub(crate) fn bad_return_from_vocabulary(module: &'static str, keyword: impl Into<String>) -> Self {
        Self::new(
            BuildErrorReason::BadReturnFromVocabulary { module, keyword: keyword.into() },
            "folding a keyword into a vocabulary module",
        )
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} while {} (at {})",
            self.reason, self.action, self.build_path
        )
    }
}

impl error::Error for BuildError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn error::Error + 'static))
    }
}

impl From<jv_referencing::Error> for BuildError {
    fn from(err: jv_referencing::Error) -> Self {
        BuildError::resolver_error(vec![("jv-referencing".to_string(), err.to_string())])
            .with_source(err)
    }
}
