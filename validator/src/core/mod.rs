//! Pure validation logic: no process spawning, no filesystem writes.

pub mod expectations;
pub mod mode;
pub mod poll;
pub mod tally;
