//! Field rules for broker specs.
//!
//! Each rule is a pure function of its input and a base path. Absent optional
//! sections impose no constraint. Malformed values are reported as violations,
//! never as failures.

use std::sync::LazyLock;

use regex::Regex;

use crate::broker::{DeliverySpec, Destination, ObjectReference};
use crate::core::duration::parse_duration;
use crate::core::field_error::{FieldError, combine, combine_all, invalid_value, missing_field};
use crate::core::path::FieldPath;

static ABSOLUTE_URI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s]+$").unwrap());

/// Require every field of a present reference.
///
/// Fields are checked as `namespace`, `name`, `kind`, `apiVersion`, and every
/// empty one is reported.
pub fn validate_reference(
    reference: Option<&ObjectReference>,
    base: &FieldPath,
) -> Option<FieldError> {
    let reference = reference?;
    combine_all([
        require(&reference.namespace, base, "namespace"),
        require(&reference.name, base, "name"),
        require(&reference.kind, base, "kind"),
        require(&reference.api_version, base, "apiVersion"),
    ])
}

/// Check delivery options: duration format, policy enum, retry sign, dead-letter sink.
pub fn validate_delivery(delivery: Option<&DeliverySpec>, base: &FieldPath) -> Option<FieldError> {
    let delivery = delivery?;

    let delay = delivery.backoff_delay.as_deref().and_then(|raw| {
        parse_duration(raw)
            .err()
            .map(|_| invalid_value(raw, base.child("backoffDelay")))
    });

    let policy = match (delivery.backoff_policy.as_deref(), delivery.policy()) {
        (Some(raw), Some(Err(_))) => Some(invalid_value(raw, base.child("backoffPolicy"))),
        _ => None,
    };

    let retry = delivery
        .retry
        .filter(|retry| *retry < 0)
        .map(|retry| invalid_value(retry, base.child("retry")));

    let sink = validate_destination(
        delivery.dead_letter_sink.as_ref(),
        &base.child("deadLetterSink"),
    );

    combine_all([delay, policy, retry, sink])
}

/// A destination needs a reference or a URI. A URI alone must be absolute; a
/// URI next to a reference must be relative.
///
/// A destination reference may omit its namespace (it defaults to the
/// namespace of the referring object).
pub fn validate_destination(
    destination: Option<&Destination>,
    base: &FieldPath,
) -> Option<FieldError> {
    let destination = destination?;
    let uri = destination.uri.as_deref().filter(|uri| !uri.is_empty());

    match (destination.reference.as_ref(), uri) {
        (None, None) => combine(
            Some(missing_field(base.child("ref"))),
            Some(missing_field(base.child("uri"))),
        ),
        (Some(reference), uri) => {
            let ref_base = base.child("ref");
            // With a ref, the uri is resolved against it and must be relative.
            let uri = uri
                .filter(|uri| ABSOLUTE_URI_RE.is_match(uri))
                .map(|uri| invalid_value(uri, base.child("uri")));
            combine_all([
                require(&reference.name, &ref_base, "name"),
                require(&reference.kind, &ref_base, "kind"),
                require(&reference.api_version, &ref_base, "apiVersion"),
                uri,
            ])
        }
        (None, Some(uri)) if !ABSOLUTE_URI_RE.is_match(uri) => {
            Some(invalid_value(uri, base.child("uri")))
        }
        (None, Some(_)) => None,
    }
}

fn require(value: &str, base: &FieldPath, field: &str) -> Option<FieldError> {
    if value.is_empty() {
        Some(missing_field(base.child(field)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field_error::render;
    use crate::core::field_error::ViolationKind;
    use crate::test_support::{delivery_with_delay, reference};

    fn config_path() -> FieldPath {
        FieldPath::from_fields(["spec", "config"])
    }

    fn delivery_path() -> FieldPath {
        FieldPath::from_fields(["spec", "delivery"])
    }

    #[test]
    fn absent_reference_is_valid() {
        assert_eq!(validate_reference(None, &config_path()), None);
    }

    #[test]
    fn complete_reference_is_valid() {
        let reference = reference("namespace", "name", "kind", "apiversion");
        assert_eq!(validate_reference(Some(&reference), &config_path()), None);
    }

    #[test]
    fn each_missing_reference_field_is_reported_alone() {
        let cases = [
            ("namespace", reference("", "name", "kind", "v1")),
            ("name", reference("ns", "", "kind", "v1")),
            ("kind", reference("ns", "name", "", "v1")),
            ("apiVersion", reference("ns", "name", "kind", "")),
        ];
        for (field, reference) in cases {
            let err = validate_reference(Some(&reference), &config_path()).expect("error");
            assert_eq!(err.violations().len(), 1);
            assert_eq!(err.violations()[0].kind(), ViolationKind::MissingField);
            assert_eq!(
                err.to_string(),
                format!("missing field(s): spec.config.{field}")
            );
        }
    }

    #[test]
    fn all_missing_reference_fields_merge_into_one_violation() {
        let err =
            validate_reference(Some(&reference("", "", "", "")), &config_path()).expect("error");
        assert_eq!(err.violations().len(), 1);
        assert_eq!(
            err.to_string(),
            "missing field(s): spec.config.apiVersion, spec.config.kind, \
             spec.config.name, spec.config.namespace"
        );
    }

    /// Only the empty string counts as missing.
    #[test]
    fn whitespace_reference_fields_are_present() {
        let reference = reference(" ", "name", "kind", "v1");
        assert_eq!(validate_reference(Some(&reference), &config_path()), None);
    }

    #[test]
    fn absent_delivery_is_valid() {
        assert_eq!(validate_delivery(None, &delivery_path()), None);
    }

    #[test]
    fn unparseable_delay_is_invalid_value() {
        let delivery = delivery_with_delay("invalid time");
        let err = validate_delivery(Some(&delivery), &delivery_path()).expect("error");
        assert_eq!(
            err.to_string(),
            "invalid value: invalid time: spec.delivery.backoffDelay"
        );
    }

    #[test]
    fn parseable_delay_is_valid() {
        let delivery = delivery_with_delay("PT0.2S");
        assert_eq!(validate_delivery(Some(&delivery), &delivery_path()), None);
    }

    #[test]
    fn known_policies_are_valid_and_others_rejected() {
        for policy in ["linear", "exponential"] {
            let delivery = DeliverySpec {
                backoff_policy: Some(policy.to_string()),
                ..DeliverySpec::default()
            };
            assert_eq!(validate_delivery(Some(&delivery), &delivery_path()), None);
        }

        let delivery = DeliverySpec {
            backoff_policy: Some("random".to_string()),
            ..DeliverySpec::default()
        };
        assert_eq!(
            render(validate_delivery(Some(&delivery), &delivery_path()).as_ref()),
            "invalid value: random: spec.delivery.backoffPolicy"
        );
    }

    #[test]
    fn delivery_checks_are_independent() {
        let delivery = DeliverySpec {
            retry: Some(-1),
            backoff_policy: Some("random".to_string()),
            backoff_delay: Some("soon".to_string()),
            ..DeliverySpec::default()
        };
        let err = validate_delivery(Some(&delivery), &delivery_path()).expect("error");
        assert_eq!(
            err.to_string(),
            [
                "invalid value: soon: spec.delivery.backoffDelay",
                "invalid value: random: spec.delivery.backoffPolicy",
                "invalid value: -1: spec.delivery.retry",
            ]
            .join("\n")
        );
    }

    #[test]
    fn zero_retry_is_valid() {
        let delivery = DeliverySpec {
            retry: Some(0),
            ..DeliverySpec::default()
        };
        assert_eq!(validate_delivery(Some(&delivery), &delivery_path()), None);
    }

    #[test]
    fn empty_dead_letter_sink_needs_ref_or_uri() {
        let err = validate_destination(Some(&Destination::default()), &FieldPath::field("sink"))
            .expect("error");
        assert_eq!(err.to_string(), "missing field(s): sink.ref, sink.uri");
    }

    #[test]
    fn dead_letter_sink_ref_may_omit_namespace() {
        let destination = Destination {
            reference: Some(reference("", "dls", "Service", "")),
            uri: None,
        };
        let err = validate_destination(Some(&destination), &FieldPath::field("sink"))
            .expect("error");
        assert_eq!(err.to_string(), "missing field(s): sink.ref.apiVersion");
    }

    #[test]
    fn dead_letter_sink_uri_must_be_absolute_without_ref() {
        let relative = Destination {
            reference: None,
            uri: Some("/dead-letters".to_string()),
        };
        assert_eq!(
            render(validate_destination(Some(&relative), &FieldPath::field("sink")).as_ref()),
            "invalid value: /dead-letters: sink.uri"
        );

        let absolute = Destination {
            reference: None,
            uri: Some("https://dls.example.com/events".to_string()),
        };
        assert_eq!(
            validate_destination(Some(&absolute), &FieldPath::field("sink")),
            None
        );

        let relative_to_ref = Destination {
            reference: Some(reference("", "dls", "Service", "v1")),
            uri: Some("/dead-letters".to_string()),
        };
        assert_eq!(
            validate_destination(Some(&relative_to_ref), &FieldPath::field("sink")),
            None
        );
    }

    #[test]
    fn dead_letter_sink_ref_rejects_absolute_uri() {
        let destination = Destination {
            reference: Some(reference("", "dls", "Service", "v1")),
            uri: Some("https://dls.example.com".to_string()),
        };
        assert_eq!(
            render(validate_destination(Some(&destination), &FieldPath::field("sink")).as_ref()),
            "invalid value: https://dls.example.com: sink.uri"
        );
    }
}
