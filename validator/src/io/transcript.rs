//! Append-only run transcript, echoed to the terminal and persisted to a log file.
//!
//! Terminal lines are colored; the file copy is plain text so it can be grepped
//! after the run. Tool output goes to the file only.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Section,
    Info,
    Pass,
    Fail,
    Detail,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Section => "====",
            Level::Info => "INFO",
            Level::Pass => "PASS",
            Level::Fail => "FAIL",
            Level::Detail => "    ",
        }
    }
}

#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    file: File,
    echo: bool,
}

impl Transcript {
    /// Open (or create) the transcript file in append mode.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create transcript dir {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open transcript {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            echo: true,
        })
    }

    /// Keep the file copy but stop echoing to the terminal.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&mut self, level: Level, message: &str) {
        let stamp = Local::now().format("%H:%M:%S").to_string();
        self.write_file(format!("[{stamp}] {} {message}\n", level.tag()).as_bytes());
        if self.echo {
            let rendered = match level {
                Level::Section => format!("\n{}", message.bold().cyan()),
                Level::Info => format!("{} {}", "ℹ".bright_cyan(), message),
                Level::Pass => format!("{} {}", "✔".bright_green(), message),
                Level::Fail => format!("{} {}", "✘".bright_red(), message.bright_white()),
                Level::Detail => format!("    {}", message.bright_black()),
            };
            let stamp = format!("[{stamp}]").dimmed();
            if level == Level::Fail {
                eprintln!("{stamp} {rendered}");
            } else {
                println!("{stamp} {rendered}");
            }
        }
    }

    /// Append raw tool output to the file copy, framed by a header.
    pub fn tool_output(&mut self, label: &str, output: &[u8]) {
        let mut buf = format!("--- {label} ---\n").into_bytes();
        buf.extend_from_slice(output);
        if !output.is_empty() && !output.ends_with(b"\n") {
            buf.push(b'\n');
        }
        buf.extend_from_slice(format!("--- end {label} ---\n").as_bytes());
        self.write_file(&buf);
    }

    fn write_file(&mut self, bytes: &[u8]) {
        if let Err(e) = self.file.write_all(bytes) {
            warn!(err = %e, path = %self.path.display(), "failed to write transcript");
        } else if let Err(e) = self.file.flush() {
            warn!(err = %e, path = %self.path.display(), "failed to flush transcript");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_tagged_and_timestamped() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("logs/validation.log");
        let mut transcript = Transcript::create(&path).expect("create").quiet();
        transcript.line(Level::Pass, "manifest name");
        transcript.line(Level::Fail, "Dockerfile missing");

        let contents = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("PASS manifest name"));
        assert!(lines[1].ends_with("FAIL Dockerfile missing"));
    }

    #[test]
    fn appends_instead_of_truncating() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("validation.log");
        Transcript::create(&path)
            .expect("create")
            .quiet()
            .line(Level::Info, "first");
        Transcript::create(&path)
            .expect("reopen")
            .quiet()
            .line(Level::Info, "second");

        let contents = std::fs::read_to_string(&path).expect("read");
        assert!(contents.contains("first"));
        assert!(contents.contains("second"));
    }

    #[test]
    fn tool_output_is_framed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("validation.log");
        let mut transcript = Transcript::create(&path).expect("create").quiet();
        transcript.tool_output("pnpm install", b"added 12 packages");

        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(
            contents,
            "--- pnpm install ---\nadded 12 packages\n--- end pnpm install ---\n"
        );
    }
}
