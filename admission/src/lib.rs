//! Admission checks for eventing brokers.
//!
//! Two entry points decide whether a broker may be stored:
//!
//! - [`core::validator::Validate`]: field presence and format rules, run on
//!   create and update.
//! - [`broker::Broker::check_immutable_fields`]: rejects changes to protected
//!   fields, run on update against the stored version.
//!
//! Both return `Option<core::field_error::FieldError>`: `None` admits, `Some`
//! rejects with every violation found.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (rules, aggregation, diffing).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Config and object loading.
//!
//! [`admission`] combines the two entry points per operation for the CLI.

pub mod admission;
pub mod broker;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
