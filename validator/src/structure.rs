//! Structural validator: required files and directories exist, legacy artifacts do not.
//!
//! Every path is checked and recorded; a single missing file never hides the rest.

use std::path::Path;

use tracing::instrument;

use crate::context::ModeContext;
use crate::core::expectations::{FORBIDDEN_PATHS, REQUIRED_DIRS, required_files};
use crate::report::Reporter;

/// Outcome of probing one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathCheck {
    RequiredFile { path: String, passed: bool },
    RequiredDir { path: String, passed: bool },
    Forbidden { path: String, passed: bool },
}

impl PathCheck {
    pub fn passed(&self) -> bool {
        match self {
            PathCheck::RequiredFile { passed, .. } => *passed,
            PathCheck::RequiredDir { passed, .. } => *passed,
            PathCheck::Forbidden { passed, .. } => *passed,
        }
    }

    pub fn label(&self) -> String {
        match self {
            PathCheck::RequiredFile { path, passed: true } => format!("file {path} exists"),
            PathCheck::RequiredFile { path, passed: false } => format!("file {path} missing"),
            PathCheck::RequiredDir { path, passed: true } => format!("directory {path} exists"),
            PathCheck::RequiredDir { path, passed: false } => {
                format!("directory {path} missing")
            }
            PathCheck::Forbidden { path, passed: true } => format!("legacy {path} absent"),
            PathCheck::Forbidden { path, passed: false } => {
                format!("legacy {path} must not be generated")
            }
        }
    }
}

/// Probe all expected paths. Read-only, so repeated calls agree.
pub fn probe_paths(project_dir: &Path, files: &[String]) -> Vec<PathCheck> {
    let mut checks = Vec::with_capacity(files.len() + REQUIRED_DIRS.len() + FORBIDDEN_PATHS.len());
    for path in files {
        checks.push(PathCheck::RequiredFile {
            path: path.clone(),
            passed: project_dir.join(path).is_file(),
        });
    }
    for path in REQUIRED_DIRS {
        checks.push(PathCheck::RequiredDir {
            path: path.to_string(),
            passed: project_dir.join(path).is_dir(),
        });
    }
    for path in FORBIDDEN_PATHS {
        checks.push(PathCheck::Forbidden {
            path: path.to_string(),
            passed: !project_dir.join(path).exists(),
        });
    }
    checks
}

/// Record every path check for the mode's project; `true` only if all passed.
#[instrument(skip_all, fields(mode = %ctx.mode))]
pub fn validate_structure(ctx: &ModeContext<'_>, reporter: &mut Reporter) -> bool {
    reporter.section(&format!("{}: structure", ctx.mode));
    let checks = probe_paths(&ctx.project_dir(), &required_files(ctx.mode));
    let mut all_passed = true;
    for check in &checks {
        all_passed &= reporter.record(check.passed(), &check.label());
    }
    all_passed
}
