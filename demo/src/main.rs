//! Render a shell app and a remote app from the archetype and wire them
//! together with Module Federation.

mod federation;

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use archetype_validator::exit_codes;
use archetype_validator::generate::CommandRenderer;
use archetype_validator::io::config::load_from_env;
use archetype_validator::io::workdir::create_work_root;
use archetype_validator::logging;
use clap::Parser;
use tracing::info;

use crate::federation::build_demo;

#[derive(Parser, Debug)]
#[command(name = "archetype-demo")]
#[command(about = "Generate a shell + remote Module Federation demo from the archetype")]
struct Cli {
    /// Directory to create the demo in (must not exist). Defaults to a fresh temp dir.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("archetype-demo: {err:#}");
        process::exit(exit_codes::FAILED);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("current dir")?;
    let config = load_from_env()?.resolve_paths(&cwd);

    let root = match cli.out {
        Some(out) => {
            if out.exists() {
                bail!("{} already exists", out.display());
            }
            fs::create_dir_all(&out).with_context(|| format!("create {}", out.display()))?;
            out
        }
        None => {
            let base = config.work_base.clone().unwrap_or_else(std::env::temp_dir);
            create_work_root(&base, "archetype-demo")?.root
        }
    };
    info!(root = %root.display(), "building demo");

    let renderer = CommandRenderer::from_config(&config);
    let layout = build_demo(&config.template_dir, &root, &renderer)?;

    println!("demo root: {}", layout.root.display());
    for app in &layout.apps {
        println!("  app:     {}", app.display());
    }
    for file in &layout.wiring {
        println!("  wrote:   {}", file.display());
    }
    println!("  log:     {}", layout.transcript.display());
    Ok(())
}
