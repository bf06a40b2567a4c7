//! Admission review: run the checks an operation calls for.
//!
//! Create runs validation, update runs validation plus the immutability check
//! against the stored object, delete is always admitted.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::broker::Broker;
use crate::core::context::{CheckContext, Operation};
use crate::core::field_error::{FieldError, FieldErrorRecord, combine};
use crate::core::validator::Validate;

/// Incoming admission request for a broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    #[serde(default)]
    pub uid: String,
    pub operation: Operation,
    pub object: Broker,
    /// Stored version; present on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Broker>,
}

/// Verdict sent back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldErrorRecord>,
}

impl AdmissionResponse {
    pub fn new(uid: impl Into<String>, errors: Option<&FieldError>) -> Self {
        Self {
            uid: uid.into(),
            allowed: errors.is_none(),
            violations: errors.map(FieldError::records).unwrap_or_default(),
        }
    }
}

/// Run the checks for `request.operation` and combine their violations.
pub fn evaluate(ctx: &CheckContext, request: &AdmissionRequest) -> Option<FieldError> {
    debug!(uid = %request.uid, operation = ?request.operation, "evaluating admission request");
    match request.operation {
        Operation::Create => request.object.validate(ctx),
        Operation::Update => combine(
            request.object.validate(ctx),
            request
                .object
                .check_immutable_fields(ctx, request.old_object.as_ref()),
        ),
        Operation::Delete => None,
    }
}

/// Evaluate `request` and build the response.
pub fn review(ctx: &CheckContext, request: &AdmissionRequest) -> AdmissionResponse {
    let errors = evaluate(ctx, request);
    let response = AdmissionResponse::new(request.uid.clone(), errors.as_ref());
    info!(
        uid = %response.uid,
        allowed = response.allowed,
        violations = response.violations.len(),
        "admission reviewed"
    );
    response
}
