//! Location bookkeeping for validation: the three paths threaded through a run
//! (`instanceLocation`, `evaluationPath`, `schemaLocation` in the output model).
use std::{fmt, fmt::Write as _, sync::Arc};

// `itoa` is used below for index formatting, matching `jsonschema/src/paths.rs`'s own
// allocation-avoiding `PathChunk::Index` rendering.

/// One segment of a location. Shared between the data, evaluation and schema paths -
/// all three are "a property name, an array index, or a keyword" sequences.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Chunk {
    Property(Arc<str>),
    Index(usize),
    Keyword(&'static str),
}

impl Chunk {
    /// A keyword marker on the evaluation path (`"$ref"`, `"$dynamicRef"`, ...).
    /// Not a `From` impl: `From<&str>` already claims every `&'a str` (lifetimes
    /// cannot distinguish trait impls), so keyword chunks are built explicitly at
    /// their push sites instead.
    #[must_use]
    pub fn keyword(value: &'static str) -> Self {
        Chunk::Keyword(value)
    }
}

impl From<&str> for Chunk {
    fn from(value: &str) -> Self {
        Chunk::Property(Arc::from(value))
    }
}
impl From<String> for Chunk {
    fn from(value: String) -> Self {
        Chunk::Property(Arc::from(value.as_str()))
    }
}
impl From<usize> for Chunk {
    fn from(value: usize) -> Self {
        Chunk::Index(value)
    }
}

/// A persistent, singly-linked path. Cloning is `O(1)` (an `Arc` bump), which matters
/// because every `validate_in` call pushes one segment and every branch of `allOf`/
/// `anyOf`/`oneOf` needs its own copy to recurse with.
#[derive(Clone, Debug, Default)]
pub struct Location(Option<Arc<Node>>);

#[derive(Debug)]
struct Node {
    chunk: Chunk,
    parent: Option<Arc<Node>>,
}

impl Location {
    #[must_use]
    pub fn root() -> Self {
        Location(None)
    }

    #[must_use]
    pub fn push(&self, chunk: impl Into<Chunk>) -> Self {
        Location(Some(Arc::new(Node {
            chunk: chunk.into(),
            parent: self.0.clone(),
        })))
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Chunk> {
        let mut buffer = Vec::new();
        let mut head = self.0.as_ref();
        while let Some(node) = head {
            buffer.push(node.chunk.clone());
            head = node.parent.as_ref();
        }
        buffer.reverse();
        buffer
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.to_vec() {
            f.write_char('/')?;
            match chunk {
                Chunk::Property(value) => {
                    for ch in value.chars() {
                        match ch {
                            '~' => f.write_str("~0")?,
                            '/' => f.write_str("~1")?,
                            _ => f.write_char(ch)?,
                        }
                    }
                }
                Chunk::Index(idx) => f.write_str(itoa::Buffer::new().format(idx))?,
                Chunk::Keyword(keyword) => f.write_str(keyword)?,
            }
        }
        Ok(())
    }
}

impl serde::Serialize for Location {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Path into the instance being validated (`instanceLocation`).
pub type DataPath = Location;
/// Path through the schema as it was *navigated*, dynamic refs included
/// (`evaluationPath`).
pub type EvalPath = Location;
/// Path through the schema as it is laid out on disk, refs followed transparently
/// (`schemaLocation`, paired with the namespace it resolves into).
pub type SchemaPath = Location;

#[cfg(test)]
mod tests {
    use super::Location;
    use test_case::test_case;

    #[test_case(&["a", "b"], "/a/b")]
    #[test_case(&["a/b", "c~d"], "/a~1b/c~0d")]
    fn display(segments: &[&str], expected: &str) {
        let mut loc = Location::root();
        for segment in segments {
            loc = loc.push(*segment);
        }
        assert_eq!(loc.to_string(), expected);
    }

    #[test]
    fn root_is_empty() {
        assert_eq!(Location::root().to_string(), "");
        assert!(Location::root().is_root());
    }

    #[test]
    fn branches_are_independent() {
        let base = Location::root().push("properties").push("name");
        let left = base.push(0usize);
        let right = base.push(1usize);
        assert_eq!(left.to_string(), "/properties/name/0");
        assert_eq!(right.to_string(), "/properties/name/1");
    }
}
