//! Deployment-mode validator: the one place where the mode changes expected content.
//!
//! Containerized projects ship a live `Dockerfile` and build an image in CI.
//! Hosted projects keep an inert `Dockerfile` (marked as unused), publish a
//! build artifact from CI instead, and take their port from the platform.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde_yaml::Value;
use tracing::instrument;

use crate::context::ModeContext;
use crate::core::expectations::{
    CI_WORKFLOW, DOCKER_BUILD_JOB, DOCKERFILE, DOCKERFILE_UNUSED_MARKER, MODERN_CONFIG,
    UPLOAD_ARTIFACT_ACTION,
};
use crate::core::mode::Mode;
use crate::report::Reporter;

static DEV_PORT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bport\s*:").unwrap());

/// What the CI workflow does, as far as the mode checks care.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkflowFacts {
    pub docker_build_job: bool,
    pub uploads_artifact: bool,
}

/// Parse a GitHub Actions workflow and extract the mode-relevant facts.
pub fn workflow_facts(yaml: &str) -> Result<WorkflowFacts> {
    let doc: Value = serde_yaml::from_str(yaml).context("parse workflow yaml")?;
    let mut facts = WorkflowFacts::default();
    let Some(jobs) = doc.get("jobs").and_then(Value::as_mapping) else {
        return Ok(facts);
    };
    for (id, job) in jobs {
        if id.as_str() == Some(DOCKER_BUILD_JOB) {
            facts.docker_build_job = true;
        }
        let steps = job.get("steps").and_then(Value::as_sequence);
        for step in steps.into_iter().flatten() {
            if step
                .get("uses")
                .and_then(Value::as_str)
                .is_some_and(|uses| uses.starts_with(UPLOAD_ARTIFACT_ACTION))
            {
                facts.uploads_artifact = true;
            }
        }
    }
    Ok(facts)
}

/// Whether a config source sets a `port:` of its own.
pub fn mentions_dev_port(source: &str) -> bool {
    DEV_PORT_RE.is_match(source)
}

/// Run the mode's assertion set; `true` only if all passed.
#[instrument(skip_all, fields(mode = %ctx.mode))]
pub fn validate_deployment(ctx: &ModeContext<'_>, reporter: &mut Reporter) -> bool {
    reporter.section(&format!("{}: deployment", ctx.mode));
    let project_dir = ctx.project_dir();
    let dockerfile_ok = check_dockerfile(&project_dir, ctx.mode, reporter);
    let workflow_ok = check_workflow(&project_dir, ctx.mode, reporter);
    let port_ok = match ctx.mode {
        Mode::Containerized => true,
        Mode::Hosted => check_no_dev_port(&project_dir, reporter),
    };
    dockerfile_ok && workflow_ok && port_ok
}

fn check_dockerfile(project_dir: &Path, mode: Mode, reporter: &mut Reporter) -> bool {
    let path = project_dir.join(DOCKERFILE);
    let Ok(contents) = fs::read_to_string(&path) else {
        return reporter.record(false, &format!("{DOCKERFILE} missing or unreadable"));
    };
    let marked = contents.contains(DOCKERFILE_UNUSED_MARKER);
    match mode {
        Mode::Containerized => reporter.record(
            !marked,
            &format!("{DOCKERFILE} is live (no '{DOCKERFILE_UNUSED_MARKER}' warning)"),
        ),
        Mode::Hosted => reporter.record(
            marked,
            &format!("{DOCKERFILE} carries the '{DOCKERFILE_UNUSED_MARKER}' warning"),
        ),
    }
}

fn check_workflow(project_dir: &Path, mode: Mode, reporter: &mut Reporter) -> bool {
    let path = project_dir.join(CI_WORKFLOW);
    if !path.exists() {
        reporter.info(&format!("{CI_WORKFLOW} not generated; workflow checks skipped"));
        return true;
    }
    let facts = match fs::read_to_string(&path)
        .with_context(|| format!("read {}", path.display()))
        .and_then(|contents| workflow_facts(&contents))
    {
        Ok(facts) => facts,
        Err(err) => {
            let ok = reporter.record(false, &format!("{CI_WORKFLOW} is valid YAML"));
            reporter.detail(&format!("{err:#}"));
            return ok;
        }
    };
    match mode {
        Mode::Containerized => reporter.record(
            facts.docker_build_job,
            &format!("{CI_WORKFLOW} has a '{DOCKER_BUILD_JOB}' job"),
        ),
        Mode::Hosted => {
            let uploads = reporter.record(
                facts.uploads_artifact,
                &format!("{CI_WORKFLOW} publishes the build artifact"),
            );
            let no_docker = reporter.record(
                !facts.docker_build_job,
                &format!("{CI_WORKFLOW} has no '{DOCKER_BUILD_JOB}' job"),
            );
            uploads && no_docker
        }
    }
}

fn check_no_dev_port(project_dir: &Path, reporter: &mut Reporter) -> bool {
    let path = project_dir.join(MODERN_CONFIG);
    match fs::read_to_string(&path) {
        Ok(contents) => reporter.record(
            !mentions_dev_port(&contents),
            &format!("{MODERN_CONFIG} leaves the port to the hosting platform"),
        ),
        Err(err) => {
            let ok = reporter.record(false, &format!("{MODERN_CONFIG} unreadable"));
            reporter.detail(&err.to_string());
            ok
        }
    }
}
