//! Aggregable, path-addressed validation errors.
//!
//! A check reports "valid" as `None` and "invalid" as a [`FieldError`] holding
//! one or more violations. Results are combined with [`combine`] (or
//! [`FieldError::also`]); `None` is the identity, so any number of rule results
//! can be folded together without special-casing the valid ones.
//!
//! Violations sharing a merge key (kind, message and details) collapse into one
//! node whose paths are the union of both inputs. Distinct keys stay siblings,
//! kept in the order they were first combined.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::path::FieldPath;

/// Message used for required fields that are absent or empty.
pub const MISSING_FIELD_MESSAGE: &str = "missing field(s)";

/// Message used when a protected field differs between two versions.
pub const IMMUTABLE_FIELDS_MESSAGE: &str = "Immutable fields changed (-old +new)";

/// Category of a single violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationKind {
    /// A required field or subtree is absent.
    MissingField,
    /// A present field failed a format or enum check.
    InvalidValue,
    /// A protected subtree differs between the stored and incoming object.
    ImmutableFieldChanged,
}

/// One violation: a message that applies to every path in `paths`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    kind: ViolationKind,
    message: String,
    paths: Vec<FieldPath>,
    details: Option<String>,
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Paths in first-seen order.
    pub fn paths(&self) -> &[FieldPath] {
        &self.paths
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Rendered paths, sorted lexicographically.
    pub fn sorted_paths(&self) -> Vec<String> {
        let mut rendered: Vec<String> = self.paths.iter().map(ToString::to_string).collect();
        rendered.sort();
        rendered
    }

    fn same_key(&self, other: &Violation) -> bool {
        self.kind == other.kind && self.message == other.message && self.details == other.details
    }

    fn absorb_paths(&mut self, paths: Vec<FieldPath>) {
        for path in paths {
            if !self.paths.contains(&path) {
                self.paths.push(path);
            }
        }
    }

    fn render_into(&self, out: &mut String) {
        out.push_str(&self.message);
        out.push_str(": ");
        out.push_str(&self.sorted_paths().join(", "));
        if let Some(details) = &self.details {
            out.push('\n');
            out.push_str(details);
        }
    }
}

/// A non-empty, ordered collection of violations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    violations: Vec<Violation>,
}

impl FieldError {
    /// Create a single violation; duplicate paths are dropped.
    pub fn new<I>(kind: ViolationKind, message: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = FieldPath>,
    {
        let mut violation = Violation {
            kind,
            message: message.into(),
            paths: Vec::new(),
            details: None,
        };
        violation.absorb_paths(paths.into_iter().collect());
        Self {
            violations: vec![violation],
        }
    }

    /// Attach a human-readable diagnostic to every violation.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        for violation in &mut self.violations {
            violation.details = Some(details.clone());
        }
        self
    }

    /// Combine `self` with an optional other error, keeping `self`'s violations first.
    pub fn also(mut self, other: Option<FieldError>) -> FieldError {
        if let Some(other) = other {
            for violation in other.violations {
                self.push(violation);
            }
        }
        self
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// True if any violation has the given kind.
    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|violation| violation.kind == kind)
    }

    /// Flatten into wire records, one per sibling violation.
    pub fn records(&self) -> Vec<FieldErrorRecord> {
        self.violations
            .iter()
            .map(|violation| FieldErrorRecord {
                message: violation.message.clone(),
                paths: violation.sorted_paths(),
                details: violation.details.clone(),
            })
            .collect()
    }

    fn push(&mut self, violation: Violation) {
        match self
            .violations
            .iter_mut()
            .find(|existing| existing.same_key(&violation))
        {
            Some(existing) => existing.absorb_paths(violation.paths),
            None => self.violations.push(violation),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (position, violation) in self.violations.iter().enumerate() {
            if position > 0 {
                out.push('\n');
            }
            violation.render_into(&mut out);
        }
        f.write_str(&out)
    }
}

impl std::error::Error for FieldError {}

/// Wire shape of one violation, e.g. inside an admission response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrorRecord {
    pub message: String,
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Combine two optional errors; `None` on either side is the identity.
pub fn combine(a: Option<FieldError>, b: Option<FieldError>) -> Option<FieldError> {
    match (a, b) {
        (Some(a), b) => Some(a.also(b)),
        (None, b) => b,
    }
}

/// Fold any number of optional errors, left to right.
pub fn combine_all<I>(errors: I) -> Option<FieldError>
where
    I: IntoIterator<Item = Option<FieldError>>,
{
    errors.into_iter().fold(None, combine)
}

/// Deterministic text form; the empty string when there is no error.
pub fn render(error: Option<&FieldError>) -> String {
    error.map(ToString::to_string).unwrap_or_default()
}

/// `missing field(s)` at `path`.
pub fn missing_field(path: FieldPath) -> FieldError {
    FieldError::new(ViolationKind::MissingField, MISSING_FIELD_MESSAGE, [path])
}

/// `invalid value: <value>` at `path`.
pub fn invalid_value(value: impl fmt::Display, path: FieldPath) -> FieldError {
    FieldError::new(
        ViolationKind::InvalidValue,
        format!("invalid value: {value}"),
        [path],
    )
}

/// Immutable-field violation naming the changed fields, with a diff as details.
pub fn immutable_changed<I>(paths: I, diff: impl Into<String>) -> FieldError
where
    I: IntoIterator<Item = FieldPath>,
{
    FieldError::new(
        ViolationKind::ImmutableFieldChanged,
        IMMUTABLE_FIELDS_MESSAGE,
        paths,
    )
    .with_details(diff)
}
