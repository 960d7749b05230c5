//! Stable exit codes for `archetype-validate`.

/// Every recorded check passed.
pub const OK: i32 = 0;
/// A prerequisite was missing, a fatal stage failed, or any check failed.
pub const FAILED: i32 = 1;
