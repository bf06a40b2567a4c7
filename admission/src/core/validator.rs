//! Composition of named rules into a single validation entry point.

use tracing::{debug, warn};

use crate::core::context::{CheckContext, SkipReason};
use crate::core::field_error::{FieldError, combine};
use crate::core::path::FieldPath;

/// Objects that can validate themselves.
pub trait Validate {
    /// `None` admits the object; `Some` carries every violation found.
    fn validate(&self, ctx: &CheckContext) -> Option<FieldError>;
}

/// Result of running one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The rule ran; `None` means no violation.
    Checked(Option<FieldError>),
    /// The rule gave up before reaching a verdict. Never fatal to the aggregate.
    Skipped(SkipReason),
}

impl From<Option<FieldError>> for RuleOutcome {
    fn from(errors: Option<FieldError>) -> Self {
        RuleOutcome::Checked(errors)
    }
}

type RuleFn<S> = dyn Fn(&CheckContext, &S, &FieldPath) -> RuleOutcome + Send + Sync;

struct Rule<S> {
    name: &'static str,
    check: Box<RuleFn<S>>,
}

/// Rule that did not reach a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    pub name: &'static str,
    pub reason: SkipReason,
}

/// Full result of [`Validator::run_report`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub errors: Option<FieldError>,
    pub skipped: Vec<SkippedRule>,
}

/// Ordered list of rules over a subject of type `S`.
///
/// Every rule runs, even after an earlier one reported violations, and the
/// results are combined in registration order.
pub struct Validator<S> {
    rules: Vec<Rule<S>>,
}

impl<S> Default for Validator<S> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<S> Validator<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. `check` receives the path of the subject.
    pub fn rule<F>(mut self, name: &'static str, check: F) -> Self
    where
        F: Fn(&CheckContext, &S, &FieldPath) -> RuleOutcome + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            name,
            check: Box::new(check),
        });
        self
    }

    /// Run every rule and combine their violations.
    pub fn run(&self, ctx: &CheckContext, subject: &S, base: &FieldPath) -> Option<FieldError> {
        self.run_report(ctx, subject, base).errors
    }

    /// Like [`Validator::run`], also listing rules that were skipped.
    pub fn run_report(
        &self,
        ctx: &CheckContext,
        subject: &S,
        base: &FieldPath,
    ) -> ValidationReport {
        let mut report = ValidationReport::default();
        for rule in &self.rules {
            match (rule.check)(ctx, subject, base) {
                RuleOutcome::Checked(errors) => {
                    debug!(rule = rule.name, path = %base, ok = errors.is_none(), "rule checked");
                    report.errors = combine(report.errors.take(), errors);
                }
                RuleOutcome::Skipped(reason) => {
                    warn!(rule = rule.name, path = %base, reason = reason.label(), "rule skipped");
                    report.skipped.push(SkippedRule {
                        name: rule.name,
                        reason,
                    });
                }
            }
        }
        report
    }
}
