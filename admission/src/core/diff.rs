//! Generic structural diff over [`Value`] trees.
//!
//! [`walk`] visits two values in lockstep and hands every differing leaf to a
//! [`DiffVisitor`]. Sequences are compared position by position, mappings key
//! by key (sorted), and anything else by equality. [`short_diff`] is the
//! visitor used for immutability errors:
//!
//! ```text
//! {mapping}.delivery.retry:
//! 	-: 3
//! 	+: 5
//! ```
//!
//! Mapping keys render as `.key`, or quoted in brackets (`["a.b"]`) when they
//! contain anything besides ASCII letters, digits, `_` and `-`.

use std::collections::BTreeSet;

use crate::core::path::{FieldPath, PathSegment};
use crate::core::value::Value;

/// Marker printed for the side of a difference that has no value.
pub const NON_EXISTENT: &str = "<non-existent>";

/// Receives one callback per differing leaf.
///
/// `None` means the value does not exist on that side (missing mapping key or
/// sequence position past the end).
pub trait DiffVisitor {
    fn difference(&mut self, path: &FieldPath, old: Option<&Value>, new: Option<&Value>);
}

/// Walk `old` and `new` together, reporting differences to `visitor`.
pub fn walk<V: DiffVisitor>(old: &Value, new: &Value, visitor: &mut V) {
    walk_at(&FieldPath::root(), old, new, visitor);
}

fn walk_at<V: DiffVisitor>(path: &FieldPath, old: &Value, new: &Value, visitor: &mut V) {
    match (old, new) {
        (Value::Sequence(old_items), Value::Sequence(new_items)) => {
            let len = old_items.len().max(new_items.len());
            for index in 0..len {
                walk_entry(
                    &path.index(index),
                    old_items.get(index),
                    new_items.get(index),
                    visitor,
                );
            }
        }
        (Value::Mapping(old_entries), Value::Mapping(new_entries)) => {
            let keys: BTreeSet<&String> = old_entries.keys().chain(new_entries.keys()).collect();
            for key in keys {
                walk_entry(
                    &path.key(key.as_str()),
                    old_entries.get(key),
                    new_entries.get(key),
                    visitor,
                );
            }
        }
        _ if old == new => {}
        _ => visitor.difference(path, Some(old), Some(new)),
    }
}

fn walk_entry<V: DiffVisitor>(
    path: &FieldPath,
    old: Option<&Value>,
    new: Option<&Value>,
    visitor: &mut V,
) {
    match (old, new) {
        (Some(old), Some(new)) => walk_at(path, old, new, visitor),
        (None, None) => {}
        _ => visitor.difference(path, old, new),
    }
}

/// Collects differences as `-`/`+` text blocks under a `{kind}` header.
#[derive(Debug)]
pub struct ShortDiff {
    label: String,
    kind: &'static str,
    out: String,
    count: usize,
}

impl ShortDiff {
    /// Start a diff whose header names the kind of the compared roots.
    pub fn new(old: &Value, new: &Value) -> Self {
        let kind = if old.kind() == new.kind() {
            old.kind()
        } else {
            "any"
        };
        Self {
            label: String::new(),
            kind,
            out: String::new(),
            count: 0,
        }
    }

    /// Prefix every header with `field`, e.g. `labels{mapping}.app:`.
    pub fn labelled(mut self, field: &FieldPath) -> Self {
        self.label = field.to_string();
        self
    }

    pub fn finish(self) -> Option<String> {
        if self.count == 0 { None } else { Some(self.out) }
    }
}

impl DiffVisitor for ShortDiff {
    fn difference(&mut self, path: &FieldPath, old: Option<&Value>, new: Option<&Value>) {
        self.count += 1;
        self.out.push_str(&self.label);
        self.out.push('{');
        self.out.push_str(self.kind);
        self.out.push('}');
        push_path(&mut self.out, path);
        self.out.push_str(":\n\t-: ");
        push_side(&mut self.out, old);
        self.out.push_str("\n\t+: ");
        push_side(&mut self.out, new);
        self.out.push('\n');
    }
}

/// Render the difference between `old` and `new`, or `None` if they are equal.
pub fn short_diff(old: &Value, new: &Value) -> Option<String> {
    let mut diff = ShortDiff::new(old, new);
    walk(old, new, &mut diff);
    diff.finish()
}

fn push_path(out: &mut String, path: &FieldPath) {
    for segment in path.segments() {
        match segment {
            PathSegment::Field(name) => {
                out.push('.');
                out.push_str(name);
            }
            PathSegment::Index(index) => out.push_str(&format!("[{index}]")),
            PathSegment::Key(key) if is_plain_key(key) => {
                out.push('.');
                out.push_str(key);
            }
            PathSegment::Key(key) => out.push_str(&format!("[{key:?}]")),
        }
    }
}

/// Keys that cannot be mistaken for more than one segment.
fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

fn push_side(out: &mut String, value: Option<&Value>) {
    match value {
        Some(value) => out.push_str(&value.to_string()),
        None => out.push_str(NON_EXISTENT),
    }
}
