//! Acceptance harness for the micro-frontend project archetype.
//!
//! The harness renders the archetype once per deployment [`core::mode::Mode`],
//! then checks the generated project the same way a reviewer would: required
//! files, substituted variables, mode-specific content, and (optionally) a real
//! dependency install, production build, and containerized smoke test.
//!
//! - **[`core`]**: Pure logic (modes, expectations, tallying, polling).
//! - **[`io`]**: Side effects (configuration, transcript, processes, HTTP, work dirs).
//!
//! The stage modules ([`generate`], [`structure`], [`content`], [`deployment`],
//! [`build`], [`container`]) each implement one validator; [`run`] sequences them.

pub mod build;
pub mod container;
pub mod content;
pub mod context;
pub mod core;
pub mod deployment;
pub mod exit_codes;
pub mod generate;
pub mod io;
pub mod logging;
pub mod prereq;
pub mod report;
pub mod run;
pub mod structure;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
