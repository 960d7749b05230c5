//! I/O helpers for the validation stages.

pub mod config;
pub mod http;
pub mod process;
pub mod transcript;
pub mod workdir;
