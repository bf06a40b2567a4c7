//! Stable exit codes for admission CLI commands.

/// Object admitted.
pub const OK: i32 = 0;
/// Command failed due to unreadable input, bad config, or other errors.
pub const INVALID: i32 = 1;
/// Object rejected: at least one violation was found.
pub const REJECTED: i32 = 2;
