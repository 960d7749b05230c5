//! Prerequisite check: every external tool the run will need is installed and new enough.

use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use semver::Version;
use tracing::debug;

use crate::io::config::ValidatorConfig;
use crate::io::process::run_command_with_timeout;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_OUTPUT_LIMIT: usize = 4_096;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v?(\d+)\.(\d+)\.(\d+)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub program: String,
    pub min_version: Option<Version>,
}

/// Why a tool is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolProblem {
    Missing { program: String },
    Outdated {
        program: String,
        found: Option<Version>,
        required: Version,
    },
}

impl ToolProblem {
    pub fn program(&self) -> &str {
        match self {
            ToolProblem::Missing { program } => program,
            ToolProblem::Outdated { program, .. } => program,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ToolProblem::Missing { program } => format!("{program} (not found)"),
            ToolProblem::Outdated {
                program,
                found: Some(found),
                required,
            } => format!("{program} (found {found}, need >= {required})"),
            ToolProblem::Outdated {
                program,
                found: None,
                required,
            } => format!("{program} (version unknown, need >= {required})"),
        }
    }
}

/// Tools needed for this run, deduplicated in first-use order.
pub fn required_tools(config: &ValidatorConfig, generate_only: bool) -> Vec<Tool> {
    let mut programs = vec![config.render.command[0].clone()];
    if !generate_only {
        programs.push("node".to_string());
        programs.push(config.package.install[0].clone());
        programs.push(config.package.build[0].clone());
        programs.push(config.container.engine.clone());
    }
    let min_node = Version::parse(&config.min_node_version).ok();

    let mut tools: Vec<Tool> = Vec::new();
    for program in programs {
        if tools.iter().any(|tool| tool.program == program) {
            continue;
        }
        let min_version = if program == "node" {
            min_node.clone()
        } else {
            None
        };
        tools.push(Tool {
            program,
            min_version,
        });
    }
    tools
}

/// First `X.Y.Z` (optionally `v`-prefixed) in a `--version` banner.
pub fn parse_version(output: &str) -> Option<Version> {
    let captures = VERSION_RE.captures(output)?;
    let part = |index: usize| captures.get(index)?.as_str().parse::<u64>().ok();
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Run `<program> --version`. A tool that spawns at all counts as present.
pub fn probe_tool(tool: &Tool) -> Option<ToolProblem> {
    let mut cmd = Command::new(&tool.program);
    cmd.arg("--version");
    let output = match run_command_with_timeout(cmd, PROBE_TIMEOUT, PROBE_OUTPUT_LIMIT) {
        Ok(output) => output,
        Err(err) => {
            debug!(program = %tool.program, err = %err, "tool probe failed");
            return Some(ToolProblem::Missing {
                program: tool.program.clone(),
            });
        }
    };
    let required = tool.min_version.as_ref()?;
    let mut banner = String::from_utf8_lossy(&output.stdout).into_owned();
    banner.push_str(&String::from_utf8_lossy(&output.stderr));
    let found = parse_version(&banner);
    match &found {
        Some(version) if version >= required => None,
        _ => Some(ToolProblem::Outdated {
            program: tool.program.clone(),
            found,
            required: required.clone(),
        }),
    }
}

/// Every problem across all required tools; empty means the run may start.
pub fn check_prerequisites(config: &ValidatorConfig, generate_only: bool) -> Vec<ToolProblem> {
    required_tools(config, generate_only)
        .iter()
        .filter_map(probe_tool)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_only_needs_only_the_render_tool() {
        let config = ValidatorConfig::default();
        let tools = required_tools(&config, true);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].program, "archetect");
    }

    #[test]
    fn full_run_needs_every_tool_once() {
        let config = ValidatorConfig::default();
        let programs: Vec<String> = required_tools(&config, false)
            .into_iter()
            .map(|tool| tool.program)
            .collect();
        assert_eq!(programs, vec!["archetect", "node", "pnpm", "docker"]);
    }

    #[test]
    fn node_carries_the_minimum_version() {
        let config = ValidatorConfig::default();
        let node = required_tools(&config, false)
            .into_iter()
            .find(|tool| tool.program == "node")
            .expect("node");
        assert_eq!(node.min_version, Some(Version::new(18, 0, 0)));
    }

    #[test]
    fn parses_common_version_banners() {
        assert_eq!(parse_version("v20.11.1\n"), Some(Version::new(20, 11, 1)));
        assert_eq!(
            parse_version("Docker version 27.3.1, build ce12230"),
            Some(Version::new(27, 3, 1))
        );
        assert_eq!(parse_version("no version here"), None);
    }

    #[test]
    fn missing_tools_are_all_reported() {
        let mut config = ValidatorConfig::default();
        config.render.command = vec!["sh".to_string()];
        config.package.install = vec!["missing-pm-5521".to_string()];
        config.package.build = vec!["missing-pm-5521".to_string()];
        config.container.engine = "missing-engine-5521".to_string();

        let problems: Vec<String> = required_tools(&config, false)
            .iter()
            .filter(|tool| tool.program != "node")
            .filter_map(probe_tool)
            .map(|problem| problem.program().to_string())
            .collect();
        assert_eq!(problems, vec!["missing-pm-5521", "missing-engine-5521"]);
    }

    #[test]
    fn outdated_tool_is_reported_with_versions() {
        let tool = Tool {
            program: "sh".to_string(),
            min_version: Some(Version::new(999, 0, 0)),
        };
        let problem = probe_tool(&tool).expect("problem");
        assert!(matches!(problem, ToolProblem::Outdated { .. }));
        assert!(problem.describe().contains("need >= 999.0.0"));
    }
}
