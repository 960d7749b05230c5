//! Deployment modes and the fixed per-mode inputs.

use std::fmt;

/// Deployment target of a generated project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Shipped as a container image; the project carries a live `Dockerfile`.
    Containerized,
    /// Built and served by a hosting platform; the `Dockerfile` is kept but inert.
    Hosted,
}

impl Mode {
    /// All modes in validation order.
    pub const ALL: [Mode; 2] = [Mode::Containerized, Mode::Hosted];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Containerized => "containerized",
            Mode::Hosted => "hosted",
        }
    }

    /// File name of the answer file for this mode, relative to the answers dir.
    pub fn answer_file(self) -> &'static str {
        match self {
            Mode::Containerized => "containerized.yaml",
            Mode::Hosted => "hosted.yaml",
        }
    }

    /// Value of `project-name` in this mode's answer file.
    pub fn project_name(self) -> &'static str {
        match self {
            Mode::Containerized => "mfe-containerized",
            Mode::Hosted => "mfe-hosted",
        }
    }

    /// Component the generated route page must reference.
    pub fn component_name(self) -> &'static str {
        match self {
            Mode::Containerized => "MfeContainerizedWidget",
            Mode::Hosted => "MfeHostedWidget",
        }
    }

    /// Whether the build stage also builds and smoke-tests a container image.
    pub fn expects_container_run(self) -> bool {
        matches!(self, Mode::Containerized)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
