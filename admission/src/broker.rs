//! Broker resource model and its admission checks.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::core::context::CheckContext;
use crate::core::field_error::FieldError;
use crate::core::immutability::{ImmutableField, ImmutableFields, check_immutable_fields};
use crate::core::path::FieldPath;
use crate::core::rules::{validate_delivery, validate_reference};
use crate::core::validator::{Validate, Validator};
use crate::core::value::Value;

/// Annotation selecting the broker implementation. Fixed after creation.
pub const BROKER_CLASS_ANNOTATION: &str = "eventing.knative.dev/broker.class";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Broker {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: BrokerSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerSpec {
    /// Optional reference to implementation-specific configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliverySpec>,
}

/// Reference to another object. When present, every field is required.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectReference {
    pub namespace: String,
    pub name: String,
    pub kind: String,
    pub api_version: String,
}

/// Event delivery options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliverySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_letter_sink: Option<Destination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<i32>,
    /// Raw policy name; see [`BackoffPolicy`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_policy: Option<String>,
    /// ISO-8601 duration, e.g. `PT0.5S`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_delay: Option<String>,
}

/// Where undeliverable events go: an object, a URI, or a URI relative to the object.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Destination {
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<ObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackoffPolicy {
    Linear,
    Exponential,
}

impl BackoffPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            BackoffPolicy::Linear => "linear",
            BackoffPolicy::Exponential => "exponential",
        }
    }
}

impl fmt::Display for BackoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackoffPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "linear" => Ok(BackoffPolicy::Linear),
            "exponential" => Ok(BackoffPolicy::Exponential),
            other => Err(format!("unknown backoff policy '{other}'")),
        }
    }
}

impl DeliverySpec {
    /// Parsed policy; `None` when unset, `Some(Err)` when unrecognised.
    pub fn policy(&self) -> Option<Result<BackoffPolicy, String>> {
        self.backoff_policy.as_deref().map(str::parse)
    }
}

impl Broker {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }

    pub fn class(&self) -> Option<&str> {
        self.annotation(BROKER_CLASS_ANNOTATION)
    }

    /// Reject changes to immutable fields relative to `original`.
    ///
    /// Creation (`original == None`) is never subject to this check.
    pub fn check_immutable_fields(
        &self,
        ctx: &CheckContext,
        original: Option<&Broker>,
    ) -> Option<FieldError> {
        check_immutable_fields(ctx, original, self)
    }
}

static SPEC_VALIDATOR: LazyLock<Validator<BrokerSpec>> = LazyLock::new(|| {
    Validator::new()
        .rule("config", |_, spec: &BrokerSpec, base| {
            validate_reference(spec.config.as_ref(), &base.child("config")).into()
        })
        .rule("delivery", |_, spec: &BrokerSpec, base| {
            validate_delivery(spec.delivery.as_ref(), &base.child("delivery")).into()
        })
});

impl BrokerSpec {
    /// Validate with paths rooted at `base`.
    pub fn validate_at(&self, ctx: &CheckContext, base: &FieldPath) -> Option<FieldError> {
        SPEC_VALIDATOR.run(ctx, self, base)
    }
}

impl Validate for BrokerSpec {
    fn validate(&self, ctx: &CheckContext) -> Option<FieldError> {
        self.validate_at(ctx, &FieldPath::root())
    }
}

impl Validate for Broker {
    fn validate(&self, ctx: &CheckContext) -> Option<FieldError> {
        self.spec.validate_at(ctx, &FieldPath::field("spec"))
    }
}

/// Protected annotations are reported under `annotations`. A single key is
/// compared as a string; several keys as a mapping of key to value. A missing
/// annotation compares as the empty string.
impl ImmutableFields for Broker {
    fn immutable_fields(&self, ctx: &CheckContext) -> Vec<ImmutableField> {
        let keys = ctx.immutable_annotations();
        let value_of = |key: &String| self.annotation(key).unwrap_or_default().to_string();

        let value = match keys {
            [] => return Vec::new(),
            [key] => Value::from(value_of(key)),
            _ => Value::from(
                keys.iter()
                    .map(|key| (key.clone(), value_of(key)))
                    .collect::<BTreeMap<_, _>>(),
            ),
        };
        vec![ImmutableField::new(FieldPath::field("annotations"), value)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{broker_with_class, reference};

    #[test]
    fn deserializes_camel_case_fields() {
        let broker: Broker = serde_json::from_value(serde_json::json!({
            "apiVersion": "eventing.knative.dev/v1beta1",
            "kind": "Broker",
            "metadata": {
                "name": "default",
                "annotations": {"eventing.knative.dev/broker.class": "MTChannelBasedBroker"}
            },
            "spec": {
                "config": {
                    "namespace": "ns",
                    "name": "cfg",
                    "kind": "ConfigMap",
                    "apiVersion": "v1"
                },
                "delivery": {
                    "deadLetterSink": {"uri": "http://dls.example.com"},
                    "retry": 3,
                    "backoffPolicy": "exponential",
                    "backoffDelay": "PT0.2S"
                }
            }
        }))
        .expect("deserialize");

        assert_eq!(broker.class(), Some("MTChannelBasedBroker"));
        assert_eq!(broker.spec.config, Some(reference("ns", "cfg", "ConfigMap", "v1")));
        let delivery = broker.spec.delivery.expect("delivery");
        assert_eq!(delivery.policy(), Some(Ok(BackoffPolicy::Exponential)));
        assert_eq!(delivery.retry, Some(3));
        assert_eq!(
            delivery.dead_letter_sink.and_then(|sink| sink.uri).as_deref(),
            Some("http://dls.example.com")
        );
    }

    #[test]
    fn partial_reference_defaults_missing_fields_to_empty() {
        let reference: ObjectReference =
            serde_json::from_str(r#"{"name": "cfg"}"#).expect("deserialize");
        assert_eq!(reference.name, "cfg");
        assert!(reference.namespace.is_empty());
    }

    #[test]
    fn backoff_policy_parses_known_names_only() {
        assert_eq!("linear".parse::<BackoffPolicy>(), Ok(BackoffPolicy::Linear));
        assert_eq!(BackoffPolicy::Exponential.to_string(), "exponential");
        assert!("Linear".parse::<BackoffPolicy>().is_err());
    }

    #[test]
    fn single_protected_annotation_is_a_string_field() {
        let broker = broker_with_class("mt");
        let fields = broker.immutable_fields(&CheckContext::default());
        assert_eq!(
            fields,
            vec![ImmutableField::new(FieldPath::field("annotations"), Value::from("mt"))]
        );
    }

    #[test]
    fn several_protected_annotations_form_a_mapping() {
        let ctx =
            CheckContext::default().with_immutable_annotations([BROKER_CLASS_ANNOTATION, "team"]);
        let fields = broker_with_class("mt").immutable_fields(&ctx);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value.kind(), "mapping");
        assert_eq!(
            fields[0].value.to_string(),
            format!(r#"{{"{BROKER_CLASS_ANNOTATION}":"mt","team":""}}"#)
        );
    }
}
