//! Generator invoker: render the archetype for one mode.
//!
//! Success means the render tool exited zero *and* the mode's project
//! directory now exists. A template source that renders nothing is a failure.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::context::ModeContext;
use crate::io::config::ValidatorConfig;
use crate::io::process::{describe, run_logged};
use crate::io::transcript::Transcript;
use crate::report::Reporter;

/// One render invocation.
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub template_dir: &'a Path,
    pub dest_dir: &'a Path,
    pub answer_file: &'a Path,
}

pub trait Renderer {
    /// Render the archetype; `Ok(false)` when the tool reported failure.
    fn render(&self, request: &RenderRequest<'_>, transcript: &mut Transcript) -> Result<bool>;
}

/// Shells out to the configured render tool.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    pub command: Vec<String>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl CommandRenderer {
    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self {
            command: config.render.command.clone(),
            timeout: config.command_timeout(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }

    /// Argv with `{source}`, `{dest}` and `{answers}` substituted.
    pub fn argv(&self, request: &RenderRequest<'_>) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| {
                arg.replace("{source}", &request.template_dir.display().to_string())
                    .replace("{dest}", &request.dest_dir.display().to_string())
                    .replace("{answers}", &request.answer_file.display().to_string())
            })
            .collect()
    }
}

impl Renderer for CommandRenderer {
    fn render(&self, request: &RenderRequest<'_>, transcript: &mut Transcript) -> Result<bool> {
        let argv = self.argv(request);
        debug!(command = %describe(&argv), "rendering archetype");
        let output = run_logged(
            &argv,
            request.dest_dir,
            self.timeout,
            self.output_limit_bytes,
            transcript,
        )?;
        Ok(output.succeeded())
    }
}

/// Flat key-value answers consumed by the render tool.
pub type Answers = BTreeMap<String, serde_yaml::Value>;

pub fn read_answers(path: &Path) -> Result<Answers> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_yaml::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

pub fn write_answers(path: &Path, answers: &Answers) -> Result<()> {
    let contents = serde_yaml::to_string(answers).context("serialize answers")?;
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

/// String form of a scalar answer.
pub fn answer_str(answers: &Answers, key: &str) -> Option<String> {
    match answers.get(key)? {
        serde_yaml::Value::String(value) => Some(value.clone()),
        serde_yaml::Value::Number(value) => Some(value.to_string()),
        serde_yaml::Value::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

/// Copy the mode's answer file into the mode dir, render, and confirm the project dir exists.
///
/// Returns `false` on the first failure; nothing after generation should run then.
#[instrument(skip_all, fields(mode = %ctx.mode))]
pub fn generate_project<R: Renderer>(
    ctx: &ModeContext<'_>,
    renderer: &R,
    reporter: &mut Reporter,
) -> Result<bool> {
    let source = ctx.answer_file();
    if !reporter.record(
        source.is_file(),
        &format!("answer file {} present", source.display()),
    ) {
        return Ok(false);
    }

    let answer_copy = ctx.mode_dir.join(ctx.mode.answer_file());
    fs::copy(&source, &answer_copy)
        .with_context(|| format!("copy {} to {}", source.display(), answer_copy.display()))?;
    warn_on_name_mismatch(ctx, &answer_copy, reporter);

    let request = RenderRequest {
        template_dir: &ctx.config.template_dir,
        dest_dir: &ctx.mode_dir,
        answer_file: &answer_copy,
    };
    let rendered = match renderer.render(&request, reporter.transcript()) {
        Ok(ok) => ok,
        Err(err) => {
            reporter.detail(&format!("{err:#}"));
            false
        }
    };
    if !reporter.record(rendered, &format!("render {} project", ctx.mode)) {
        return Ok(false);
    }

    Ok(reporter.record(
        ctx.project_dir().is_dir(),
        &format!(
            "project directory {}/{} created",
            ctx.mode,
            ctx.mode.project_name()
        ),
    ))
}

fn warn_on_name_mismatch(ctx: &ModeContext<'_>, answer_file: &Path, reporter: &mut Reporter) {
    match read_answers(answer_file) {
        Ok(answers) => match answer_str(&answers, "project-name") {
            Some(name) if name == ctx.mode.project_name() => {}
            Some(name) => reporter.info(&format!(
                "answer file names project '{name}', expected '{}'",
                ctx.mode.project_name()
            )),
            None => reporter.info("answer file has no project-name"),
        },
        Err(err) => reporter.info(&format!("answer file is not flat YAML: {err:#}")),
    }
}
