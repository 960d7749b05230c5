//! Validator configuration.
//!
//! Built-in defaults describe the real toolchain. A TOML file named by
//! `ARCHETYPE_VALIDATOR_CONFIG` may override any field (missing fields keep
//! their defaults), which is how tests swap in fake tools.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::poll::PollPolicy;

pub const CONFIG_ENV: &str = "ARCHETYPE_VALIDATOR_CONFIG";

/// Default jinja openers: any `{{`, `{%` or `{#`.
///
/// A `{{` right after `=` is a JSX object literal (`style={{ padding: 8 }}`) unless its
/// contents read like an expression, and `${{` is a GitHub Actions expression.
pub const DEFAULT_PLACEHOLDER_PATTERN: &str = r#"(?:^|[^=$])\{\{|=\{\{-|=\{\{\s*[A-Za-z_'"0-9][^\s:}{,]*\s*(?:\}\}|[|~.(\[])|\{%|\{#"#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Archetype source tree handed to the render tool.
    pub template_dir: PathBuf,
    /// Directory holding `<mode>.yaml` answer files.
    pub answers_dir: PathBuf,
    /// Parent of the per-run work root. Defaults to the system temp dir.
    pub work_base: Option<PathBuf>,
    /// Wall-clock limit for any single external command.
    pub command_timeout_secs: u64,
    /// Tool output kept in memory (and copied to the transcript) per stream.
    pub output_limit_bytes: usize,
    /// Regex matching an unrendered template placeholder.
    pub placeholder_pattern: String,
    /// Oldest acceptable `node --version`.
    pub min_node_version: String,
    pub render: RenderConfig,
    pub package: PackageConfig,
    pub container: ContainerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    /// Render argv. `{source}`, `{dest}` and `{answers}` are substituted.
    pub command: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            command: [
                "archetect",
                "render",
                "{source}",
                "{dest}",
                "--answer-file",
                "{answers}",
                "--headless",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PackageConfig {
    pub install: Vec<String>,
    pub build: Vec<String>,
    /// Build output directory, relative to the project.
    pub output_dir: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            install: vec!["pnpm".to_string(), "install".to_string()],
            build: vec!["pnpm".to_string(), "run".to_string(), "build".to_string()],
            output_dir: "dist".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContainerConfig {
    pub engine: String,
    pub image: String,
    pub name: String,
    pub host_port: u16,
    pub container_port: u16,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub http_timeout_secs: u64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            image: "mfe-archetype-validate:latest".to_string(),
            name: "mfe-archetype-validate".to_string(),
            host_port: 18080,
            container_port: 8080,
            poll_interval_ms: 2_000,
            max_poll_attempts: 30,
            http_timeout_secs: 5,
        }
    }
}

impl ContainerConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://localhost:{}/", self.host_port)
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("archetype"),
            answers_dir: PathBuf::from("answers"),
            work_base: None,
            command_timeout_secs: 15 * 60,
            output_limit_bytes: 1_000_000,
            placeholder_pattern: DEFAULT_PLACEHOLDER_PATTERN.to_string(),
            min_node_version: "18.0.0".to_string(),
            render: RenderConfig::default(),
            package: PackageConfig::default(),
            container: ContainerConfig::default(),
        }
    }
}

impl ValidatorConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_command("render.command", &self.render.command)?;
        ensure_command("package.install", &self.package.install)?;
        ensure_command("package.build", &self.package.build)?;
        if self.package.output_dir.trim().is_empty() {
            return Err(anyhow!("package.output_dir must be non-empty"));
        }
        if self.container.engine.trim().is_empty() {
            return Err(anyhow!("container.engine must be non-empty"));
        }
        if self.container.host_port == 0 || self.container.container_port == 0 {
            return Err(anyhow!("container ports must be > 0"));
        }
        if self.container.max_poll_attempts == 0 {
            return Err(anyhow!("container.max_poll_attempts must be > 0"));
        }
        if self.container.http_timeout_secs == 0 {
            return Err(anyhow!("container.http_timeout_secs must be > 0"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        regex::Regex::new(&self.placeholder_pattern)
            .with_context(|| "placeholder_pattern must be a valid regex")?;
        semver::Version::parse(&self.min_node_version)
            .with_context(|| "min_node_version must be a semver version")?;
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Resolve relative directories against `root`.
    pub fn resolve_paths(mut self, root: &Path) -> Self {
        if self.template_dir.is_relative() {
            self.template_dir = root.join(&self.template_dir);
        }
        if self.answers_dir.is_relative() {
            self.answers_dir = root.join(&self.answers_dir);
        }
        if let Some(base) = &self.work_base
            && base.is_relative()
        {
            self.work_base = Some(root.join(base));
        }
        self
    }
}

fn ensure_command(field: &str, command: &[String]) -> Result<()> {
    if command.is_empty() || command[0].trim().is_empty() {
        return Err(anyhow!("{field} must be a non-empty array"));
    }
    Ok(())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ValidatorConfig::default()`.
pub fn load_config(path: &Path) -> Result<ValidatorConfig> {
    if !path.exists() {
        let cfg = ValidatorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ValidatorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load the override file named by [`CONFIG_ENV`], or the defaults when unset.
pub fn load_from_env() -> Result<ValidatorConfig> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(anyhow!(
                    "{CONFIG_ENV} points to missing file {}",
                    path.display()
                ));
            }
            load_config(&path)
        }
        None => {
            let cfg = ValidatorConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

/// Write config as TOML.
pub fn write_config(path: &Path, cfg: &ValidatorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
