//! Container lifecycle check for the containerized mode.
//!
//! Build the image, start it on a fixed host port, poll until it answers, and
//! inspect the served page. The container is always stopped and removed
//! afterwards, whatever the checks concluded.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, instrument, warn};

use crate::context::ModeContext;
use crate::core::expectations::{MIN_PAGE_BYTES, page_markers};
use crate::core::mode::Mode;
use crate::core::poll::{PollOutcome, wait_until};
use crate::io::config::ValidatorConfig;
use crate::io::http::{HttpProbe, HttpResponse};
use crate::io::process::run_logged;
use crate::io::transcript::Transcript;
use crate::report::Reporter;

pub trait ContainerEngine {
    /// Force-remove a container by name. Missing containers are not an error.
    fn remove(&self, name: &str, transcript: &mut Transcript) -> Result<()>;
    fn build_image(
        &self,
        context_dir: &Path,
        image: &str,
        transcript: &mut Transcript,
    ) -> Result<bool>;
    /// Start detached with `ports = (host, container)`.
    fn run_detached(
        &self,
        image: &str,
        name: &str,
        ports: (u16, u16),
        transcript: &mut Transcript,
    ) -> Result<bool>;
    fn stop(&self, name: &str, transcript: &mut Transcript) -> Result<()>;
}

/// Drives the `docker` CLI (or any CLI-compatible engine such as `podman`).
#[derive(Debug, Clone)]
pub struct DockerEngine {
    pub program: String,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl DockerEngine {
    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self {
            program: config.container.engine.clone(),
            timeout: config.command_timeout(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }

    fn run(&self, args: &[&str], workdir: &Path, transcript: &mut Transcript) -> Result<bool> {
        let mut argv = vec![self.program.clone()];
        argv.extend(args.iter().map(|arg| arg.to_string()));
        let output = run_logged(
            &argv,
            workdir,
            self.timeout,
            self.output_limit_bytes,
            transcript,
        )?;
        Ok(output.succeeded())
    }
}

impl ContainerEngine for DockerEngine {
    fn remove(&self, name: &str, transcript: &mut Transcript) -> Result<()> {
        self.run(&["rm", "-f", name], Path::new("."), transcript)?;
        Ok(())
    }

    fn build_image(
        &self,
        context_dir: &Path,
        image: &str,
        transcript: &mut Transcript,
    ) -> Result<bool> {
        self.run(&["build", "-t", image, "."], context_dir, transcript)
    }

    fn run_detached(
        &self,
        image: &str,
        name: &str,
        ports: (u16, u16),
        transcript: &mut Transcript,
    ) -> Result<bool> {
        let publish = format!("{}:{}", ports.0, ports.1);
        self.run(
            &["run", "-d", "--name", name, "-p", &publish, image],
            Path::new("."),
            transcript,
        )
    }

    fn stop(&self, name: &str, transcript: &mut Transcript) -> Result<()> {
        self.run(&["stop", name], Path::new("."), transcript)?;
        Ok(())
    }
}

/// Whether a served page looks like the generated app rather than an error stub.
pub fn page_identifies_app(body: &str, mode: Mode) -> bool {
    body.to_ascii_lowercase().contains("<title")
        || page_markers(mode).iter().any(|marker| body.contains(marker))
}

/// Build, run, probe, and tear down the container; `true` only if every step passed.
#[instrument(skip_all, fields(mode = %ctx.mode))]
pub fn check_container<E: ContainerEngine, H: HttpProbe>(
    ctx: &ModeContext<'_>,
    engine: &E,
    probe: &H,
    reporter: &mut Reporter,
) -> bool {
    reporter.section(&format!("{}: container", ctx.mode));
    let container = &ctx.config.container;

    // A container left over from an earlier run would hold the name and port.
    best_effort(
        "remove stale container",
        engine.remove(&container.name, reporter.transcript()),
    );

    let built = engine
        .build_image(&ctx.project_dir(), &container.image, reporter.transcript())
        .unwrap_or_else(|err| {
            warn!(err = %err, "image build could not run");
            false
        });
    if !reporter.record(built, &format!("image {} built", container.image)) {
        return false;
    }

    let started = engine
        .run_detached(
            &container.image,
            &container.name,
            (container.host_port, container.container_port),
            reporter.transcript(),
        )
        .unwrap_or_else(|err| {
            warn!(err = %err, "container start could not run");
            false
        });
    let passed = if reporter.record(
        started,
        &format!(
            "container {} started on port {}",
            container.name, container.host_port
        ),
    ) {
        smoke_test(ctx, probe, reporter)
    } else {
        false
    };

    best_effort(
        "stop container",
        engine.stop(&container.name, reporter.transcript()),
    );
    best_effort(
        "remove container",
        engine.remove(&container.name, reporter.transcript()),
    );
    reporter.info(&format!("container {} stopped and removed", container.name));
    passed
}

fn smoke_test<H: HttpProbe>(ctx: &ModeContext<'_>, probe: &H, reporter: &mut Reporter) -> bool {
    let container = &ctx.config.container;
    let url = container.base_url();
    let policy = container.poll_policy();

    let outcome = wait_until(policy, |attempt| match probe.get(&url) {
        Ok(response) if response.is_success() => Some(response),
        Ok(response) => {
            debug!(attempt, status = response.status, "container not ready");
            None
        }
        Err(err) => {
            debug!(attempt, err = %err, "container not reachable");
            None
        }
    });

    let page: HttpResponse = match outcome {
        PollOutcome::Ready { value, attempts } => {
            reporter.record(true, &format!("{url} ready after {attempts} attempt(s)"));
            value
        }
        PollOutcome::TimedOut { attempts } => {
            return reporter.record(
                false,
                &format!(
                    "{url} not ready after {attempts} attempt(s) ({}s)",
                    policy.max_wait().as_secs()
                ),
            );
        }
    };

    let sized = reporter.record(
        page.body.len() >= MIN_PAGE_BYTES,
        &format!("page body is {} bytes (min {MIN_PAGE_BYTES})", page.body.len()),
    );
    let identified = reporter.record(
        page_identifies_app(&page.body, ctx.mode),
        "page body identifies the generated app",
    );
    sized && identified
}

fn best_effort(step: &str, result: Result<()>) {
    if let Err(err) = result {
        debug!(step, err = %err, "ignored container cleanup error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::ValidatorConfig;
    use crate::test_support::{FakeEngine, ScriptedProbe, TestWorkspace, app_page};

    fn fast_config(ws: &TestWorkspace) -> ValidatorConfig {
        let mut config = ws.config.clone();
        config.container.poll_interval_ms = 0;
        config.container.max_poll_attempts = 3;
        config
    }

    #[test]
    fn healthy_container_passes_and_is_cleaned_up() {
        let ws = TestWorkspace::new().expect("workspace");
        let config = fast_config(&ws);
        let ctx = ModeContext::new(
            Mode::Containerized,
            &ws.generated(Mode::Containerized).expect("ctx").mode_dir,
            &config,
        );
        let engine = FakeEngine::default();
        let probe = ScriptedProbe::new(vec![None, Some(app_page(Mode::Containerized))]);
        let mut reporter = ws.reporter().expect("reporter");

        assert!(check_container(&ctx, &engine, &probe, &mut reporter));
        assert_eq!(probe.requests(), 2);
        assert_eq!(
            engine.calls(),
            vec![
                "rm mfe-archetype-validate",
                "build mfe-archetype-validate:latest",
                "run mfe-archetype-validate mfe-archetype-validate:latest 18080:8080",
                "stop mfe-archetype-validate",
                "rm mfe-archetype-validate",
            ]
        );
        assert_eq!(reporter.tally().failed, 0);
    }

    #[test]
    fn readiness_timeout_fails_but_still_cleans_up() {
        let ws = TestWorkspace::new().expect("workspace");
        let config = fast_config(&ws);
        let ctx = ModeContext::new(
            Mode::Containerized,
            &ws.generated(Mode::Containerized).expect("ctx").mode_dir,
            &config,
        );
        let engine = FakeEngine::default();
        let probe = ScriptedProbe::new(Vec::new());
        let mut reporter = ws.reporter().expect("reporter");

        assert!(!check_container(&ctx, &engine, &probe, &mut reporter));
        assert_eq!(probe.requests(), 3);
        let calls = engine.calls();
        assert_eq!(calls[calls.len() - 2], "stop mfe-archetype-validate");
        assert_eq!(calls[calls.len() - 1], "rm mfe-archetype-validate");
        let transcript = ws.transcript_contents().expect("transcript");
        assert!(transcript.contains("not ready after 3 attempt(s)"));
    }

    #[test]
    fn image_build_failure_skips_run() {
        let ws = TestWorkspace::new().expect("workspace");
        let ctx = ws.generated(Mode::Containerized).expect("ctx");
        let engine = FakeEngine::failing_build();
        let probe = ScriptedProbe::new(Vec::new());
        let mut reporter = ws.reporter().expect("reporter");

        assert!(!check_container(&ctx, &engine, &probe, &mut reporter));
        assert_eq!(probe.requests(), 0);
        assert!(!engine.calls().iter().any(|call| call.starts_with("run ")));
    }

    #[test]
    fn start_failure_is_reported_and_cleaned_up() {
        let ws = TestWorkspace::new().expect("workspace");
        let ctx = ws.generated(Mode::Containerized).expect("ctx");
        let engine = FakeEngine::failing_run();
        let probe = ScriptedProbe::new(Vec::new());
        let mut reporter = ws.reporter().expect("reporter");

        assert!(!check_container(&ctx, &engine, &probe, &mut reporter));
        assert_eq!(probe.requests(), 0);
        assert!(engine.calls().contains(&"stop mfe-archetype-validate".to_string()));
    }

    #[test]
    fn tiny_error_page_fails_body_checks() {
        let ws = TestWorkspace::new().expect("workspace");
        let config = fast_config(&ws);
        let ctx = ModeContext::new(
            Mode::Containerized,
            &ws.generated(Mode::Containerized).expect("ctx").mode_dir,
            &config,
        );
        let engine = FakeEngine::default();
        let probe = ScriptedProbe::new(vec![Some(HttpResponse {
            status: 200,
            body: "ok".to_string(),
        })]);
        let mut reporter = ws.reporter().expect("reporter");

        assert!(!check_container(&ctx, &engine, &probe, &mut reporter));
        assert_eq!(reporter.tally().failed, 2);
    }

    #[test]
    fn page_markers_accept_title_or_known_words() {
        assert!(page_identifies_app("<html><TITLE>x</TITLE>", Mode::Containerized));
        assert!(page_identifies_app("Powered by Modern.js", Mode::Hosted));
        assert!(page_identifies_app("mfe-hosted", Mode::Hosted));
        assert!(!page_identifies_app("502 Bad Gateway", Mode::Containerized));
    }
}
