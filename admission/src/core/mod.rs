//! Deterministic, pure admission logic.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod context;
pub mod diff;
pub mod duration;
pub mod field_error;
pub mod immutability;
pub mod path;
pub mod rules;
pub mod validator;
pub mod value;
