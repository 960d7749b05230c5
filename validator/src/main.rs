//! `archetype-validate`: render the archetype in both deployment modes and check the output.

use std::time::Duration;

use anyhow::{Context, Result};
use archetype_validator::container::DockerEngine;
use archetype_validator::exit_codes;
use archetype_validator::generate::CommandRenderer;
use archetype_validator::io::config::load_from_env;
use archetype_validator::io::http::ReqwestProbe;
use archetype_validator::logging;
use archetype_validator::prereq::check_prerequisites;
use archetype_validator::run::{RunOptions, Toolchain, run_validation};
use clap::Parser;
use colored::Colorize;

#[derive(Parser)]
#[command(
    name = "archetype-validate",
    version,
    about = "Render the micro-frontend archetype in both deployment modes and validate the result"
)]
struct Cli {
    /// Stop after generation and file/content checks (no install, build, or container run).
    #[arg(long)]
    generate_only: bool,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let repo_root = std::env::current_dir().context("read current dir")?;
    let config = load_from_env()?.resolve_paths(&repo_root);

    let problems = check_prerequisites(&config, cli.generate_only);
    if !problems.is_empty() {
        eprintln!("{}", "missing prerequisites:".red().bold());
        for problem in &problems {
            eprintln!("  - {}", problem.describe());
        }
        return Ok(exit_codes::FAILED);
    }

    let tools = Toolchain {
        renderer: CommandRenderer::from_config(&config),
        engine: DockerEngine::from_config(&config),
        probe: ReqwestProbe::new(Duration::from_secs(config.container.http_timeout_secs))?,
    };
    let options = RunOptions {
        generate_only: cli.generate_only,
    };
    let summary = run_validation(&config, options, &tools)?;
    Ok(summary.exit_code())
}
