//! Run orchestration: validate each mode in turn and fold the results.
//!
//! Per mode: generate → structure → content → deployment → (unless
//! generate-only) install → build → container (containerized only).
//! Generation, the validation gate, install, and build failures abort the
//! whole run; container failures are recorded and the next mode still runs.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::build::{build_project, install_dependencies};
use crate::container::{ContainerEngine, check_container};
use crate::content::validate_content;
use crate::context::ModeContext;
use crate::core::mode::Mode;
use crate::core::tally::Tally;
use crate::deployment::validate_deployment;
use crate::exit_codes;
use crate::generate::{Renderer, generate_project};
use crate::io::config::ValidatorConfig;
use crate::io::http::HttpProbe;
use crate::io::transcript::Transcript;
use crate::io::workdir::create_work_root;
use crate::report::Reporter;
use crate::structure::validate_structure;

pub const WORK_ROOT_PREFIX: &str = "archetype-validate";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after generation and the file/content checks.
    pub generate_only: bool,
}

/// External collaborators a run drives.
pub struct Toolchain<R, E, H> {
    pub renderer: R,
    pub engine: E,
    pub probe: H,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeVerdict {
    /// Every check for the mode passed.
    Passed,
    /// Some non-fatal check failed; later modes still run.
    Failed,
    /// A fatal step failed; no further modes run.
    Aborted,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub tally: Tally,
    pub elapsed: Duration,
    pub verdicts: Vec<(Mode, ModeVerdict)>,
    pub work_root: PathBuf,
    pub transcript: PathBuf,
}

impl RunSummary {
    pub fn aborted(&self) -> bool {
        self.verdicts
            .iter()
            .any(|(_, verdict)| *verdict == ModeVerdict::Aborted)
    }

    pub fn exit_code(&self) -> i32 {
        if self.tally.is_clean() && !self.aborted() {
            exit_codes::OK
        } else {
            exit_codes::FAILED
        }
    }

    pub fn mode_dir(&self, mode: Mode) -> PathBuf {
        self.work_root.join(mode.name())
    }
}

/// Validate both modes in a fresh work root.
#[instrument(skip_all, fields(generate_only = options.generate_only))]
pub fn run_validation<R, E, H>(
    config: &ValidatorConfig,
    options: RunOptions,
    tools: &Toolchain<R, E, H>,
) -> Result<RunSummary>
where
    R: Renderer,
    E: ContainerEngine,
    H: HttpProbe,
{
    let started = Instant::now();
    let base = config.work_base.clone().unwrap_or_else(std::env::temp_dir);
    let work = create_work_root(&base, WORK_ROOT_PREFIX).context("create work root")?;
    let transcript = Transcript::create(&work.transcript_path()).context("open transcript")?;
    let mut reporter = Reporter::new(transcript);
    info!(work_root = %work.root.display(), "validation started");
    reporter.info(&format!("work root {}", work.root.display()));
    if options.generate_only {
        reporter.info("generate-only: install, build and container checks skipped");
    }

    let mut verdicts = Vec::new();
    for mode in Mode::ALL {
        let mode_dir = work.create_mode_dir(mode)?;
        let ctx = ModeContext::new(mode, &mode_dir, config);
        let verdict = validate_mode(&ctx, options, tools, &mut reporter)?;
        info!(mode = %mode, verdict = ?verdict, "mode finished");
        verdicts.push((mode, verdict));
        if verdict == ModeVerdict::Aborted {
            reporter.info(&format!("{mode} aborted; remaining modes skipped"));
            break;
        }
    }

    let summary = RunSummary {
        tally: reporter.tally(),
        elapsed: started.elapsed(),
        verdicts,
        work_root: work.root.clone(),
        transcript: work.transcript_path(),
    };
    report_summary(&summary, &mut reporter);
    Ok(summary)
}

/// Run one mode's pipeline against its own project directory.
pub fn validate_mode<R, E, H>(
    ctx: &ModeContext<'_>,
    options: RunOptions,
    tools: &Toolchain<R, E, H>,
    reporter: &mut Reporter,
) -> Result<ModeVerdict>
where
    R: Renderer,
    E: ContainerEngine,
    H: HttpProbe,
{
    reporter.section(&format!("{}: generate", ctx.mode));
    if !generate_project(ctx, &tools.renderer, reporter)? {
        return Ok(ModeVerdict::Aborted);
    }

    let structure_ok = validate_structure(ctx, reporter);
    let content_ok = validate_content(ctx, reporter)?;
    let deployment_ok = validate_deployment(ctx, reporter);
    if !(structure_ok && content_ok && deployment_ok) {
        return Ok(ModeVerdict::Aborted);
    }
    if options.generate_only {
        return Ok(ModeVerdict::Passed);
    }

    if !install_dependencies(ctx, reporter) || !build_project(ctx, reporter) {
        return Ok(ModeVerdict::Aborted);
    }

    if !ctx.mode.expects_container_run() {
        reporter.info(&format!("{}: container checks not applicable", ctx.mode));
        return Ok(ModeVerdict::Passed);
    }
    if check_container(ctx, &tools.engine, &tools.probe, reporter) {
        Ok(ModeVerdict::Passed)
    } else {
        Ok(ModeVerdict::Failed)
    }
}

fn report_summary(summary: &RunSummary, reporter: &mut Reporter) {
    reporter.section("summary");
    reporter.info(&format!(
        "passed {} / failed {} in {:.1}s",
        summary.tally.passed,
        summary.tally.failed,
        summary.elapsed.as_secs_f64()
    ));
    if summary.exit_code() != exit_codes::OK {
        reporter.info(&format!("transcript: {}", summary.transcript.display()));
        for (mode, _) in &summary.verdicts {
            reporter.info(&format!(
                "{mode} project: {}",
                summary.mode_dir(*mode).join(mode.project_name()).display()
            ));
        }
    }
}
