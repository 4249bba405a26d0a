//! Deferred, opt-in value coercion (SPEC_FULL.md §4.6).
//!
//! A compiled subschema may carry a single [`CastDescriptor`]: "after this subschema
//! validates successfully, transform the value". Multiple nested subschemas validating
//! the *same* data path may each want to register one, but at most one must actually
//! apply - the outermost registration wins, everything inside it is silently shadowed.
use ahash::AHashMap;

use crate::format::FormatRegistry;

/// What to do to a value once its subschema has validated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CastDescriptor {
    /// Apply the named format's `validate_cast`.
    Format(String),
}

impl CastDescriptor {
    pub(crate) fn apply(
        &self,
        registry: &FormatRegistry,
        data: serde_json::Value,
    ) -> serde_json::Value {
        match self {
            CastDescriptor::Format(name) => registry
                .validate_cast(name, &data)
                .unwrap_or(data),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct CastFrame {
    depth: usize,
    cast: Option<CastDescriptor>,
}

/// `{data_path -> {depth, cast?}}`, per SPEC_FULL.md §4.6, plus the flat
/// `data_path -> already-cast value` table a completed outermost pop writes into.
/// The results table travels alongside the frame table through `detach`/
/// `merge_tracked` so a cast computed inside a `validate_as` scope survives iff that
/// scope's validation ultimately succeeded.
#[derive(Clone, Debug, Default)]
pub struct CastStacks {
    frames: AHashMap<String, CastFrame>,
    results: AHashMap<String, serde_json::Value>,
}

impl CastStacks {
    #[must_use]
    pub fn new() -> Self {
        CastStacks::default()
    }

    /// The `data_path -> cast value` table accumulated so far.
    #[must_use]
    pub fn results(&self) -> &AHashMap<String, serde_json::Value> {
        &self.results
    }

    /// Record the value a just-completed outermost pop produced at `path`.
    pub fn record(&mut self, path: &str, value: serde_json::Value) {
        self.results.insert(path.to_string(), value);
    }

    /// Enter a subschema at `path` that may want to register `candidate`.
    pub fn push(&mut self, path: &str, candidate: Option<CastDescriptor>) {
        let frame = self.frames.entry(path.to_string()).or_default();
        if frame.depth == 0 && frame.cast.is_none() {
            frame.cast = candidate;
        }
        frame.depth += 1;
    }

    /// Leave a subschema at `path`. Returns `Some(descriptor)` only when this pop
    /// unwound the outermost frame - the moment the cast must actually apply.
    pub fn pop(&mut self, path: &str) -> Option<CastDescriptor> {
        let Some(frame) = self.frames.get_mut(path) else { return None };
        frame.depth = frame.depth.saturating_sub(1);
        if frame.depth == 0 {
            let cast = frame.cast.take();
            self.frames.remove(path);
            cast
        } else {
            None
        }
    }

    /// Detach a fresh, empty stack for a keyword-scope shift (`validate_as`),
    /// returning the previous contents to merge back later via [`Self::merge_tracked`].
    pub fn detach(&mut self) -> CastStacks {
        std::mem::take(self)
    }

    /// Merge an inner (detached) stack back into `self`: the outer registration
    /// always wins; an outer slot holding `{n, nil}` adopts the inner cast if any.
    /// Results computed inside the inner scope are always folded in - they were only
    /// ever produced for already-finished (popped) frames, so there is no shadowing
    /// question to resolve for them.
    pub fn merge_tracked(&mut self, inner: CastStacks) {
        for (path, inner_frame) in inner.frames {
            match self.frames.get_mut(&path) {
                Some(outer_frame) if outer_frame.cast.is_some() => {}
                Some(outer_frame) => outer_frame.cast = inner_frame.cast,
                None => {
                    self.frames.insert(path, inner_frame);
                }
            }
        }
        self.results.extend(inner.results);
    }
}

#[cfg(test)]
mod tests {
    use super::{CastDescriptor, CastStacks};

    #[test]
    fn outermost_registration_wins() {
        let mut stacks = CastStacks::new();
        stacks.push("/x", Some(CastDescriptor::Format("date".into())));
        stacks.push("/x", Some(CastDescriptor::Format("uuid".into())));
        assert_eq!(stacks.pop("/x"), None, "inner pop does not apply yet");
        assert_eq!(
            stacks.pop("/x"),
            Some(CastDescriptor::Format("date".into())),
            "outer pop applies the outermost registration"
        );
    }

    #[test]
    fn merge_tracked_prefers_outer() {
        let mut outer = CastStacks::new();
        outer.push("/x", Some(CastDescriptor::Format("date".into())));
        let mut inner = CastStacks::new();
        inner.push("/x", Some(CastDescriptor::Format("uuid".into())));
        outer.merge_tracked(inner);
        assert_eq!(
            outer.pop("/x"),
            Some(CastDescriptor::Format("date".into()))
        );
    }

    #[test]
    fn merge_tracked_adopts_inner_when_outer_empty() {
        let mut outer = CastStacks::new();
        outer.push("/x", None);
        let mut inner = CastStacks::new();
        inner.push("/x", Some(CastDescriptor::Format("uuid".into())));
        outer.merge_tracked(inner);
        assert_eq!(
            outer.pop("/x"),
            Some(CastDescriptor::Format("uuid".into()))
        );
    }
}
