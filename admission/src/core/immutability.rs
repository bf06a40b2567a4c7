//! Immutable-field checks across object versions.
//!
//! Types declare which of their fields are immutable by implementing
//! [`ImmutableFields`]. The checker compares the declarations of both versions
//! with the generic structural diff, so declaring a new immutable field needs
//! no new comparison code.

use tracing::debug;

use crate::core::context::CheckContext;
use crate::core::diff::{ShortDiff, short_diff, walk};
use crate::core::field_error::{FieldError, immutable_changed};
use crate::core::path::FieldPath;
use crate::core::value::Value;

/// One protected subtree, extracted from an object.
#[derive(Clone, Debug, PartialEq)]
pub struct ImmutableField {
    /// Reported path of the field (e.g. `annotations`).
    pub path: FieldPath,
    pub value: Value,
}

impl ImmutableField {
    pub fn new(path: FieldPath, value: Value) -> Self {
        Self { path, value }
    }
}

/// Declares the fields of an object that may not change across updates.
///
/// Implementations must return the same fields, in the same order, for every
/// object of the type given the same context.
pub trait ImmutableFields {
    fn immutable_fields(&self, ctx: &CheckContext) -> Vec<ImmutableField>;
}

/// Validate that the immutable fields of `current` match `original`.
///
/// Returns `None` when `original` is absent (creation) or nothing changed.
/// Otherwise returns a single violation naming every changed field, with the
/// diffs of all changed fields as details. When more than one field changed,
/// each diff header starts with the path of its field.
pub fn check_immutable_fields<T: ImmutableFields>(
    ctx: &CheckContext,
    original: Option<&T>,
    current: &T,
) -> Option<FieldError> {
    let original = original?;

    let before = original.immutable_fields(ctx);
    let after = current.immutable_fields(ctx);
    let len = before.len().max(after.len());
    let missing = Value::null();

    let mut changes = Vec::new();
    for position in 0..len {
        let old = before.get(position);
        let new = after.get(position);
        let Some(path) = new.or(old).map(|field| &field.path) else {
            continue;
        };
        let old_value = old.map_or(&missing, |field| &field.value);
        let new_value = new.map_or(&missing, |field| &field.value);
        if old_value != new_value {
            debug!(field = %path, "immutable field changed");
            changes.push((path, old_value, new_value));
        }
    }

    // Several changed fields need their diffs told apart.
    let labelled = changes.len() > 1;
    let mut changed = Vec::with_capacity(changes.len());
    let mut details = String::new();
    for (path, old_value, new_value) in changes {
        let text = if labelled {
            let mut diff = ShortDiff::new(old_value, new_value).labelled(path);
            walk(old_value, new_value, &mut diff);
            diff.finish()
        } else {
            short_diff(old_value, new_value)
        };
        if let Some(text) = text {
            changed.push(path.clone());
            details.push_str(&text);
        }
    }

    if changed.is_empty() {
        return None;
    }
    Some(immutable_changed(changed, details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Test object whose `labels` and `template` are immutable.
    #[derive(Clone)]
    struct Resource {
        labels: Value,
        template: Value,
        replicas: i64,
    }

    impl ImmutableFields for Resource {
        fn immutable_fields(&self, _ctx: &CheckContext) -> Vec<ImmutableField> {
            vec![
                ImmutableField::new(FieldPath::field("labels"), self.labels.clone()),
                ImmutableField::new(
                    FieldPath::field("spec").child("template"),
                    self.template.clone(),
                ),
            ]
        }
    }

    fn resource() -> Resource {
        Resource {
            labels: Value::from(json!({"app": "web"})),
            template: Value::from(json!({"image": "web:1", "ports": [80]})),
            replicas: 1,
        }
    }

    #[test]
    fn creation_is_never_checked() {
        let ctx = CheckContext::default();
        assert_eq!(check_immutable_fields(&ctx, None, &resource()), None);
    }

    #[test]
    fn identical_versions_pass() {
        let ctx = CheckContext::default();
        let current = resource();
        assert_eq!(check_immutable_fields(&ctx, Some(&current.clone()), &current), None);
    }

    #[test]
    fn mutable_fields_may_change() {
        let ctx = CheckContext::default();
        let original = resource();
        let mut current = resource();
        current.replicas = 5;
        assert_ne!(original.replicas, current.replicas);
        assert_eq!(check_immutable_fields(&ctx, Some(&original), &current), None);
    }

    #[test]
    fn every_changed_field_is_named_with_its_diff() {
        let ctx = CheckContext::default();
        let original = resource();
        let mut current = resource();
        current.labels = Value::from(json!({"app": "api"}));
        current.template = Value::from(json!({"image": "web:1", "ports": [80, 443]}));

        let err = check_immutable_fields(&ctx, Some(&original), &current).expect("error");
        assert_eq!(err.violations().len(), 1);
        assert_eq!(
            err.to_string(),
            concat!(
                "Immutable fields changed (-old +new): labels, spec.template\n",
                "labels{mapping}.app:\n\t-: \"web\"\n\t+: \"api\"\n",
                "spec.template{mapping}.ports[1]:\n\t-: <non-existent>\n\t+: 443\n",
            )
        );
    }

    #[test]
    fn single_changed_field_is_not_labelled() {
        let ctx = CheckContext::default();
        let original = resource();
        let mut current = resource();
        current.labels = Value::from(json!({"app": "api"}));

        let err = check_immutable_fields(&ctx, Some(&original), &current).expect("error");
        assert_eq!(
            err.to_string(),
            "Immutable fields changed (-old +new): labels\n\
             {mapping}.app:\n\t-: \"web\"\n\t+: \"api\"\n"
        );
    }
}
