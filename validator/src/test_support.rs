//! Test-only helpers: scratch workspaces, well-formed generated projects, and
//! scripted fakes for the render tool, container engine, and HTTP probe.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::container::ContainerEngine;
use crate::context::ModeContext;
use crate::core::expectations::{CI_WORKFLOW, DOCKERFILE_UNUSED_MARKER, component_path};
use crate::core::mode::Mode;
use crate::generate::{Answers, RenderRequest, Renderer, answer_str, read_answers};
use crate::io::config::ValidatorConfig;
use crate::io::http::{HttpProbe, HttpResponse};
use crate::io::transcript::Transcript;
use crate::report::Reporter;

/// Scratch directory laid out like a repo checkout: `archetype/`, `answers/`, `work/`.
pub struct TestWorkspace {
    temp: TempDir,
    pub config: ValidatorConfig,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("tempdir")?;
        let root = temp.path();
        let config = ValidatorConfig {
            template_dir: root.join("archetype"),
            answers_dir: root.join("answers"),
            work_base: Some(root.join("work")),
            ..ValidatorConfig::default()
        };
        fs::create_dir_all(&config.template_dir).context("create template dir")?;
        fs::create_dir_all(&config.answers_dir).context("create answers dir")?;
        for mode in Mode::ALL {
            write_mode_answers(&config.answers_dir.join(mode.answer_file()), mode)?;
        }
        Ok(Self { temp, config })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Mode context with its mode dir created under `work/`.
    pub fn context(&self, mode: Mode) -> Result<ModeContext<'_>> {
        let mode_dir = self.root().join("work").join(mode.name());
        fs::create_dir_all(&mode_dir).with_context(|| format!("create {}", mode_dir.display()))?;
        Ok(ModeContext::new(mode, &mode_dir, &self.config))
    }

    /// Context whose project has already been written.
    pub fn generated(&self, mode: Mode) -> Result<ModeContext<'_>> {
        let ctx = self.context(mode)?;
        write_project(&ctx.project_dir(), mode)?;
        Ok(ctx)
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.root().join("validation.log")
    }

    pub fn reporter(&self) -> Result<Reporter> {
        Ok(Reporter::new(
            Transcript::create(&self.transcript_path())?.quiet(),
        ))
    }

    pub fn transcript_contents(&self) -> Result<String> {
        fs::read_to_string(self.transcript_path()).context("read transcript")
    }
}

pub fn mode_answers(mode: Mode) -> Answers {
    let mut answers = Answers::new();
    let mut put = |key: &str, value: &str| {
        answers.insert(key.to_string(), serde_yaml::Value::String(value.to_string()));
    };
    put("project-name", mode.project_name());
    put("component-name", mode.component_name());
    put("deployment", mode.name());
    put("dev-port", "3050");
    put("remote-name", &mode.project_name().replace('-', "_"));
    answers
}

pub fn write_mode_answers(path: &Path, mode: Mode) -> Result<()> {
    crate::generate::write_answers(path, &mode_answers(mode))
}

/// Write a project that passes every structural, content, and deployment check.
pub fn write_project(project_dir: &Path, mode: Mode) -> Result<()> {
    let name = mode.project_name();
    let component = mode.component_name();
    let mut files: Vec<(String, String)> = vec![
        (
            "package.json".to_string(),
            format!(
                "{{\n  \"name\": \"{name}\",\n  \"version\": \"0.1.0\",\n  \"private\": true,\n  \"scripts\": {{ \"dev\": \"modern dev\", \"build\": \"modern build\" }}\n}}\n"
            ),
        ),
        (
            "modern.config.ts".to_string(),
            match mode {
                Mode::Containerized => "export default defineConfig({\n  server: { port: 8080 },\n  plugins: [appTools({ bundler: 'rspack' })],\n});\n".to_string(),
                Mode::Hosted => "export default defineConfig({\n  plugins: [appTools({ bundler: 'rspack' })],\n});\n".to_string(),
            },
        ),
        (
            "module-federation.config.ts".to_string(),
            format!("export default createModuleFederationConfig({{ name: '{}' }});\n", name.replace('-', "_")),
        ),
        ("tsconfig.json".to_string(), "{ \"compilerOptions\": { \"jsx\": \"react-jsx\" } }\n".to_string()),
        (
            "Dockerfile".to_string(),
            match mode {
                Mode::Containerized => "FROM node:20-alpine\nCOPY dist /app\nCMD [\"node\", \"/app/server.js\"]\n".to_string(),
                Mode::Hosted => format!("# NOTE: this {DOCKERFILE_UNUSED_MARKER} by hosted deployments.\nFROM node:20-alpine\n"),
            },
        ),
        ("README.md".to_string(), format!("# {name}\n")),
        (".gitignore".to_string(), "node_modules\ndist\n".to_string()),
        (
            "src/routes/page.tsx".to_string(),
            format!("import {component} from '../components/{component}';\n\nexport default () => <{component} />;\n"),
        ),
        (
            "src/routes/layout.tsx".to_string(),
            "export default ({ children }) => <main>{children}</main>;\n".to_string(),
        ),
        (
            component_path(mode),
            format!("export default function {component}() {{\n  return <div style={{{{ padding: 8 }}}}>{name}</div>;\n}}\n"),
        ),
        ("public/favicon.svg".to_string(), "<svg/>\n".to_string()),
    ];
    files.push((
        CI_WORKFLOW.to_string(),
        match mode {
            Mode::Containerized => "name: ci\non: [push]\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n  docker-build:\n    runs-on: ubuntu-latest\n    needs: build\n    steps:\n      - run: docker build .\n".to_string(),
            Mode::Hosted => "name: ci\non: [push]\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n      - run: pnpm build\n      - uses: actions/upload-artifact@v4\n        with:\n          name: dist\n          path: dist\n".to_string(),
        },
    ));

    for (relative, contents) in files {
        let path = project_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FakeRender {
    Project,
    Empty,
    Fail,
}

/// Render tool stand-in that writes a well-formed project for whichever mode
/// the answer file names.
#[derive(Debug, Clone, Copy)]
pub struct FakeRenderer {
    behavior: FakeRender,
}

impl FakeRenderer {
    pub fn project() -> Self {
        Self {
            behavior: FakeRender::Project,
        }
    }

    /// Exits zero but writes nothing.
    pub fn empty() -> Self {
        Self {
            behavior: FakeRender::Empty,
        }
    }

    pub fn failing() -> Self {
        Self {
            behavior: FakeRender::Fail,
        }
    }
}

impl Renderer for FakeRenderer {
    fn render(&self, request: &RenderRequest<'_>, _transcript: &mut Transcript) -> Result<bool> {
        match self.behavior {
            FakeRender::Fail => Ok(false),
            FakeRender::Empty => Ok(true),
            FakeRender::Project => {
                let answers = read_answers(request.answer_file)?;
                let name = answer_str(&answers, "project-name")
                    .ok_or_else(|| anyhow!("answers missing project-name"))?;
                let mode = Mode::ALL
                    .into_iter()
                    .find(|mode| mode.project_name() == name)
                    .ok_or_else(|| anyhow!("no mode for project {name}"))?;
                write_project(&request.dest_dir.join(&name), mode)?;
                Ok(true)
            }
        }
    }
}

/// Container engine stand-in that records every call.
#[derive(Debug, Default)]
pub struct FakeEngine {
    build_fails: bool,
    run_fails: bool,
    calls: RefCell<Vec<String>>,
}

impl FakeEngine {
    pub fn failing_build() -> Self {
        Self {
            build_fails: true,
            ..Self::default()
        }
    }

    pub fn failing_run() -> Self {
        Self {
            run_fails: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn push(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl ContainerEngine for FakeEngine {
    fn remove(&self, name: &str, _transcript: &mut Transcript) -> Result<()> {
        self.push(format!("rm {name}"));
        Ok(())
    }

    fn build_image(
        &self,
        _context_dir: &Path,
        image: &str,
        _transcript: &mut Transcript,
    ) -> Result<bool> {
        self.push(format!("build {image}"));
        Ok(!self.build_fails)
    }

    fn run_detached(
        &self,
        image: &str,
        name: &str,
        ports: (u16, u16),
        _transcript: &mut Transcript,
    ) -> Result<bool> {
        self.push(format!("run {name} {image} {}:{}", ports.0, ports.1));
        Ok(!self.run_fails)
    }

    fn stop(&self, name: &str, _transcript: &mut Transcript) -> Result<()> {
        self.push(format!("stop {name}"));
        Ok(())
    }
}

/// HTTP probe that replays queued responses; `None` entries and an empty queue are errors.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    responses: RefCell<VecDeque<Option<HttpResponse>>>,
    requests: RefCell<u32>,
}

impl ScriptedProbe {
    pub fn new(responses: Vec<Option<HttpResponse>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(0),
        }
    }

    pub fn requests(&self) -> u32 {
        *self.requests.borrow()
    }
}

impl HttpProbe for ScriptedProbe {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        *self.requests.borrow_mut() += 1;
        match self.responses.borrow_mut().pop_front() {
            Some(Some(response)) => Ok(response),
            _ => Err(anyhow!("connection refused: {url}")),
        }
    }
}

/// A served page that passes the body checks.
pub fn app_page(mode: Mode) -> HttpResponse {
    let body = format!(
        "<!doctype html><html><head><title>{}</title></head><body><div id=\"root\"></div>{}</body></html>",
        mode.project_name(),
        "<script src=\"/static/js/main.js\"></script>".repeat(4)
    );
    HttpResponse { status: 200, body }
}
