//! Helpers for building and rendering deterministic field paths.

use std::fmt;

/// One step in a field path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// Named struct field, rendered as `.name`.
    Field(String),
    /// Sequence position, rendered as `[index]`.
    Index(usize),
    /// Mapping key, rendered as `[key]`.
    Key(String),
}

/// Ordered sequence of segments addressing a field inside an object.
///
/// Segments are kept apart until rendering so a field name containing `.`
/// can never be confused with two nested fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The empty path (the object itself).
    pub fn root() -> Self {
        Self::default()
    }

    /// Path consisting of a single field.
    pub fn field(name: impl Into<String>) -> Self {
        Self::root().child(name)
    }

    /// Build a path from `.`-free field names, outermost first.
    pub fn from_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: names
                .into_iter()
                .map(|name| PathSegment::Field(name.into()))
                .collect(),
        }
    }

    /// Return a new path extended by a named field.
    pub fn child(&self, name: impl Into<String>) -> Self {
        self.with(PathSegment::Field(name.into()))
    }

    /// Return a new path extended by a sequence index.
    pub fn index(&self, index: usize) -> Self {
        self.with(PathSegment::Index(index))
    }

    /// Return a new path extended by a mapping key.
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.with(PathSegment::Key(key.into()))
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    fn with(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if position == 0 => write!(f, "{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
                PathSegment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}
