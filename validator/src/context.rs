//! The "current mode" value threaded through every stage.

use std::path::{Path, PathBuf};

use crate::core::mode::Mode;
use crate::io::config::ValidatorConfig;

#[derive(Debug, Clone)]
pub struct ModeContext<'a> {
    pub mode: Mode,
    /// `<work root>/<mode>`; the render tool writes the project inside it.
    pub mode_dir: PathBuf,
    pub config: &'a ValidatorConfig,
}

impl<'a> ModeContext<'a> {
    pub fn new(mode: Mode, mode_dir: &Path, config: &'a ValidatorConfig) -> Self {
        Self {
            mode,
            mode_dir: mode_dir.to_path_buf(),
            config,
        }
    }

    pub fn project_dir(&self) -> PathBuf {
        self.mode_dir.join(self.mode.project_name())
    }

    pub fn answer_file(&self) -> PathBuf {
        self.config.answers_dir.join(self.mode.answer_file())
    }
}
