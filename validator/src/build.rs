//! Build validator: install dependencies and produce a production build.

use tracing::{info, instrument};

use crate::context::ModeContext;
use crate::io::process::{describe, run_logged};
use crate::report::Reporter;

/// Run one package-manager step in the project dir, judged by exit status.
fn run_step(ctx: &ModeContext<'_>, argv: &[String], reporter: &mut Reporter) -> bool {
    let label = describe(argv);
    let succeeded = match run_logged(
        argv,
        &ctx.project_dir(),
        ctx.config.command_timeout(),
        ctx.config.output_limit_bytes,
        reporter.transcript(),
    ) {
        Ok(output) => {
            if output.timed_out {
                reporter.detail(&format!(
                    "timed out after {}s",
                    ctx.config.command_timeout_secs
                ));
            }
            output.succeeded()
        }
        Err(err) => {
            reporter.detail(&format!("{err:#}"));
            false
        }
    };
    info!(command = %label, succeeded, "package step finished");
    reporter.record(succeeded, &format!("{label} ({})", ctx.mode))
}

/// Install dependencies. Failure is fatal to the mode.
#[instrument(skip_all, fields(mode = %ctx.mode))]
pub fn install_dependencies(ctx: &ModeContext<'_>, reporter: &mut Reporter) -> bool {
    reporter.section(&format!("{}: install", ctx.mode));
    run_step(ctx, &ctx.config.package.install, reporter)
}

/// Production build; success also requires the output directory.
#[instrument(skip_all, fields(mode = %ctx.mode))]
pub fn build_project(ctx: &ModeContext<'_>, reporter: &mut Reporter) -> bool {
    reporter.section(&format!("{}: build", ctx.mode));
    if !run_step(ctx, &ctx.config.package.build, reporter) {
        return false;
    }
    let output_dir = &ctx.config.package.output_dir;
    reporter.record(
        ctx.project_dir().join(output_dir).is_dir(),
        &format!("build output {output_dir}/ exists"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mode::Mode;
    use crate::io::config::ValidatorConfig;
    use crate::test_support::TestWorkspace;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn config_with(ws: &TestWorkspace, install: &str, build: &str) -> ValidatorConfig {
        let mut config = ws.config.clone();
        config.package.install = sh(install);
        config.package.build = sh(build);
        config
    }

    #[test]
    fn install_and_build_pass_when_dist_is_produced() {
        let ws = TestWorkspace::new().expect("workspace");
        let config = config_with(&ws, "mkdir node_modules", "mkdir dist");
        let mode_dir = ws.generated(Mode::Hosted).expect("ctx").mode_dir;
        let ctx = ModeContext::new(Mode::Hosted, &mode_dir, &config);
        let mut reporter = ws.reporter().expect("reporter");

        assert!(install_dependencies(&ctx, &mut reporter));
        assert!(build_project(&ctx, &mut reporter));
        assert!(ctx.project_dir().join("node_modules").is_dir());
        assert_eq!(reporter.tally().passed, 3);
    }

    #[test]
    fn install_failure_is_recorded() {
        let ws = TestWorkspace::new().expect("workspace");
        let config = config_with(&ws, "echo 'ERR_PNPM_FETCH_404' >&2; exit 1", "true");
        let mode_dir = ws.generated(Mode::Hosted).expect("ctx").mode_dir;
        let ctx = ModeContext::new(Mode::Hosted, &mode_dir, &config);
        let mut reporter = ws.reporter().expect("reporter");

        assert!(!install_dependencies(&ctx, &mut reporter));
        assert_eq!(reporter.tally().failed, 1);
        let transcript = ws.transcript_contents().expect("transcript");
        assert!(transcript.contains("ERR_PNPM_FETCH_404"));
    }

    #[test]
    fn build_without_output_dir_fails() {
        let ws = TestWorkspace::new().expect("workspace");
        let config = config_with(&ws, "true", "true");
        let mode_dir = ws.generated(Mode::Containerized).expect("ctx").mode_dir;
        let ctx = ModeContext::new(Mode::Containerized, &mode_dir, &config);
        let mut reporter = ws.reporter().expect("reporter");

        assert!(!build_project(&ctx, &mut reporter));
        assert_eq!(reporter.tally().passed, 1);
        assert_eq!(reporter.tally().failed, 1);
    }

    #[test]
    fn missing_package_manager_fails_the_step() {
        let ws = TestWorkspace::new().expect("workspace");
        let mut config = ws.config.clone();
        config.package.install = vec!["no-such-package-manager-9312".to_string()];
        let mode_dir = ws.generated(Mode::Hosted).expect("ctx").mode_dir;
        let ctx = ModeContext::new(Mode::Hosted, &mode_dir, &config);
        let mut reporter = ws.reporter().expect("reporter");

        assert!(!install_dependencies(&ctx, &mut reporter));
    }
}
