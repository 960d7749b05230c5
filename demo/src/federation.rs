//! Shell + remote federation wiring rendered on top of two generated apps.
//!
//! The archetype produces standalone apps. The demo renders it twice and then
//! rewrites the federation config of each so the shell consumes the remote's
//! exposed widget at runtime.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use archetype_validator::generate::{Answers, RenderRequest, Renderer, write_answers};
use archetype_validator::io::transcript::{Level, Transcript};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::{debug, info};

const REMOTE_MF_CONFIG: &str = r#"import { createModuleFederationConfig } from '@module-federation/modern-js';

export default createModuleFederationConfig({
  name: '{{ remote.federation_name }}',
  exposes: {
    './Widget': './src/components/{{ remote.component }}.tsx',
  },
  shared: {
    react: { singleton: true },
    'react-dom': { singleton: true },
  },
});
"#;

const SHELL_MF_CONFIG: &str = r#"import { createModuleFederationConfig } from '@module-federation/modern-js';

export default createModuleFederationConfig({
  name: '{{ shell.federation_name }}',
  remotes: {
    remote: '{{ remote.federation_name }}@http://localhost:{{ remote.port }}/mf-manifest.json',
  },
  shared: {
    react: { singleton: true },
    'react-dom': { singleton: true },
  },
});
"#;

const SHELL_PAGE: &str = r#"import { Suspense, lazy } from 'react';
import {{ shell.component }} from '../components/{{ shell.component }}';

const RemoteWidget = lazy(() => import('remote/Widget'));

export default function Index() {
  return (
    <main>
      <{{ shell.component }} />
      <Suspense fallback={<p>Loading {{ remote.name }}...</p>}>
        <RemoteWidget />
      </Suspense>
    </main>
  );
}
"#;

const COMPOSE: &str = r#"services:
{%- for app in [remote, shell] %}
  {{ app.name }}:
    build: ./{{ app.name }}
    ports:
      - "{{ app.port }}:8080"
{%- if app.role == "shell" %}
    depends_on:
      - {{ remote.name }}
{%- endif %}
{%- endfor %}
"#;

const README: &str = r#"# Module Federation demo

Two apps rendered from the micro-frontend archetype.

| app | role | port |
| --- | --- | --- |
{%- for app in [shell, remote] %}
| `{{ app.name }}` | {{ app.role }} | {{ app.port }} |
{%- endfor %}

The shell lazily loads `remote/Widget`, served from
`http://localhost:{{ remote.port }}/mf-manifest.json`.

Start the remote first:

```bash
cd {{ remote.name }} && pnpm install && pnpm dev
cd {{ shell.name }} && pnpm install && pnpm dev
```

Or run both containers with `docker compose up --build`.
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Shell,
    Remote,
}

/// One rendered app of the demo.
#[derive(Debug, Clone, Serialize)]
pub struct FederatedApp {
    pub role: Role,
    pub name: String,
    pub component: String,
    pub federation_name: String,
    pub port: u16,
}

impl FederatedApp {
    pub fn shell() -> Self {
        Self::new(Role::Shell, "shell", "ShellFrame", 3050)
    }

    pub fn remote() -> Self {
        Self::new(Role::Remote, "remote", "RemoteWidget", 3051)
    }

    fn new(role: Role, name: &str, component: &str, port: u16) -> Self {
        Self {
            role,
            name: name.to_string(),
            component: component.to_string(),
            federation_name: name.replace('-', "_"),
            port,
        }
    }

    pub fn answers(&self) -> Answers {
        let mut answers = Answers::new();
        let mut put = |key: &str, value: serde_yaml::Value| {
            answers.insert(key.to_string(), value);
        };
        put("project-name", self.name.clone().into());
        put("component-name", self.component.clone().into());
        put("deployment", "containerized".into());
        put("dev-port", u64::from(self.port).into());
        put("remote-name", self.federation_name.clone().into());
        answers
    }
}

/// A file written over a generated app, relative to the demo root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiringFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Render every wiring file for the shell/remote pair.
pub fn render_wiring(shell: &FederatedApp, remote: &FederatedApp) -> Result<Vec<WiringFile>> {
    let mut env = Environment::new();
    let templates = [
        ("remote_mf", REMOTE_MF_CONFIG),
        ("shell_mf", SHELL_MF_CONFIG),
        ("shell_page", SHELL_PAGE),
        ("compose", COMPOSE),
        ("readme", README),
    ];
    for (name, source) in templates {
        env.add_template(name, source)
            .with_context(|| format!("parse template {name}"))?;
    }

    let ctx = context! { shell => shell, remote => remote };
    let targets = [
        ("remote_mf", Path::new(&remote.name).join("module-federation.config.ts")),
        ("shell_mf", Path::new(&shell.name).join("module-federation.config.ts")),
        ("shell_page", Path::new(&shell.name).join("src/routes/page.tsx")),
        ("compose", PathBuf::from("docker-compose.yml")),
        ("readme", PathBuf::from("README.md")),
    ];
    targets
        .into_iter()
        .map(|(name, path)| -> Result<WiringFile> {
            let contents = env
                .get_template(name)?
                .render(&ctx)
                .with_context(|| format!("render {name}"))?;
            Ok(WiringFile { path, contents })
        })
        .collect()
}

/// Paths produced by [`build_demo`].
#[derive(Debug, Clone)]
pub struct DemoLayout {
    pub root: PathBuf,
    pub apps: Vec<PathBuf>,
    pub wiring: Vec<PathBuf>,
    pub transcript: PathBuf,
}

/// Render both apps into `root` and overwrite their federation wiring.
pub fn build_demo<R: Renderer>(
    template_dir: &Path,
    root: &Path,
    renderer: &R,
) -> Result<DemoLayout> {
    let transcript_path = root.join("demo.log");
    let mut transcript = Transcript::create(&transcript_path)?;
    let shell = FederatedApp::shell();
    let remote = FederatedApp::remote();

    let mut apps = Vec::new();
    for app in [&remote, &shell] {
        apps.push(render_app(template_dir, root, app, renderer, &mut transcript)?);
    }

    let mut wiring = Vec::new();
    for file in render_wiring(&shell, &remote)? {
        let path = root.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, &file.contents).with_context(|| format!("write {}", path.display()))?;
        debug!(path = %path.display(), "wrote wiring");
        wiring.push(path);
    }
    transcript.line(Level::Pass, "federation wiring written");

    Ok(DemoLayout {
        root: root.to_path_buf(),
        apps,
        wiring,
        transcript: transcript_path,
    })
}

fn render_app<R: Renderer>(
    template_dir: &Path,
    root: &Path,
    app: &FederatedApp,
    renderer: &R,
    transcript: &mut Transcript,
) -> Result<PathBuf> {
    let answer_file = root.join(format!("{}.yaml", app.name));
    write_answers(&answer_file, &app.answers())?;
    info!(app = %app.name, "rendering app");

    let request = RenderRequest {
        template_dir,
        dest_dir: root,
        answer_file: &answer_file,
    };
    if !renderer.render(&request, transcript)? {
        transcript.line(Level::Fail, &format!("render {}", app.name));
        bail!("render tool failed for {}", app.name);
    }
    let project = root.join(&app.name);
    if !project.is_dir() {
        transcript.line(Level::Fail, &format!("render {}", app.name));
        bail!("render tool did not create {}", project.display());
    }
    transcript.line(Level::Pass, &format!("render {}", app.name));
    Ok(project)
}
