//! Per-invocation work root.
//!
//! Every run gets a fresh directory named after the start time plus a random
//! suffix. Each mode renders into its own subdirectory. Nothing is cleaned up
//! afterwards so failures can be inspected.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Local;
use rand::{Rng, distributions::Alphanumeric};

use crate::core::mode::Mode;

pub const TRANSCRIPT_FILE: &str = "validation.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkRoot {
    pub root: PathBuf,
    pub name: String,
}

impl WorkRoot {
    pub fn transcript_path(&self) -> PathBuf {
        self.root.join(TRANSCRIPT_FILE)
    }

    pub fn mode_dir(&self, mode: Mode) -> PathBuf {
        self.root.join(mode.name())
    }

    /// Create the mode subdirectory. It must not exist yet.
    pub fn create_mode_dir(&self, mode: Mode) -> Result<PathBuf> {
        let dir = self.mode_dir(mode);
        if dir.exists() {
            bail!("mode dir {} already exists", dir.display());
        }
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        Ok(dir)
    }
}

/// Create a fresh work root under `base_dir`.
pub fn create_work_root(base_dir: &Path, prefix: &str) -> Result<WorkRoot> {
    fs::create_dir_all(base_dir)
        .with_context(|| format!("create work base {}", base_dir.display()))?;

    let timestamp = generate_timestamp();
    let short_id = generate_short_id();
    let name = build_work_root_name(prefix, &timestamp, &short_id);
    let root = base_dir.join(&name);
    if root.exists() {
        bail!("work root {} already exists", root.display());
    }
    fs::create_dir_all(&root).with_context(|| format!("create work root {}", root.display()))?;
    Ok(WorkRoot { root, name })
}

pub fn build_work_root_name(prefix: &str, timestamp: &str, short_id: &str) -> String {
    format!("{prefix}_{timestamp}_{short_id}")
}

fn generate_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(6)
        .collect::<String>()
        .to_lowercase()
}
