//! Per-request context threaded through every check.
//!
//! Current rules are pure and never look at cancellation. A rule that can
//! block consults [`CheckContext::interrupted`] and reports
//! [`RuleOutcome::Skipped`](crate::core::validator::RuleOutcome::Skipped)
//! instead of waiting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::broker::BROKER_CLASS_ANNOTATION;

/// Admission operation being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Why a rule did not run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Cancelled,
    DeadlineExceeded,
}

impl SkipReason {
    pub fn label(self) -> &'static str {
        match self {
            SkipReason::Cancelled => "cancelled",
            SkipReason::DeadlineExceeded => "deadline exceeded",
        }
    }
}

/// Shared cancellation flag; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct CheckContext {
    operation: Operation,
    deadline: Option<Instant>,
    cancellation: Cancellation,
    immutable_annotations: Vec<String>,
}

impl Default for CheckContext {
    fn default() -> Self {
        Self {
            operation: Operation::Create,
            deadline: None,
            cancellation: Cancellation::default(),
            immutable_annotations: vec![BROKER_CLASS_ANNOTATION.to_string()],
        }
    }
}

impl CheckContext {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            ..Self::default()
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Replace the annotation keys that may not change across updates.
    pub fn with_immutable_annotations<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.immutable_annotations = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn immutable_annotations(&self) -> &[String] {
        &self.immutable_annotations
    }

    /// `Some` once the request was cancelled or its deadline passed.
    pub fn interrupted(&self) -> Option<SkipReason> {
        if self.cancellation.is_cancelled() {
            return Some(SkipReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(SkipReason::DeadlineExceeded),
            _ => None,
        }
    }
}
