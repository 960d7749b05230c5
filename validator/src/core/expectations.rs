//! What a correctly generated project looks like.
//!
//! Paths are relative to the generated project directory.

use super::mode::Mode;

pub const MANIFEST: &str = "package.json";
pub const ROUTE_PAGE: &str = "src/routes/page.tsx";
pub const MODERN_CONFIG: &str = "modern.config.ts";
pub const DOCKERFILE: &str = "Dockerfile";
pub const CI_WORKFLOW: &str = ".github/workflows/ci.yml";

/// Present only in the hosted variant of the `Dockerfile`.
pub const DOCKERFILE_UNUSED_MARKER: &str = "Dockerfile is not used";
/// Job id of the image build in the containerized CI workflow.
pub const DOCKER_BUILD_JOB: &str = "docker-build";
/// Action prefix of the artifact publish step in the hosted CI workflow.
pub const UPLOAD_ARTIFACT_ACTION: &str = "actions/upload-artifact";

/// Directories never scanned for leftover placeholders.
pub const SKIPPED_DIRS: [&str; 2] = ["node_modules", ".git"];

const COMMON_FILES: [&str; 9] = [
    MANIFEST,
    MODERN_CONFIG,
    "module-federation.config.ts",
    "tsconfig.json",
    DOCKERFILE,
    "README.md",
    ".gitignore",
    ROUTE_PAGE,
    "src/routes/layout.tsx",
];

pub const REQUIRED_DIRS: [&str; 4] = ["src", "src/routes", "src/components", "public"];

/// Artifacts of the pre-Rspack webpack layout; generating any of them is a regression.
pub const FORBIDDEN_PATHS: [&str; 4] = [
    "webpack.config.js",
    ".babelrc",
    "src/bootstrap.tsx",
    "config/webpack",
];

/// Required files for a mode, including the generated component.
pub fn required_files(mode: Mode) -> Vec<String> {
    let mut files: Vec<String> = COMMON_FILES.iter().map(|path| path.to_string()).collect();
    files.push(component_path(mode));
    files
}

pub fn component_path(mode: Mode) -> String {
    format!("src/components/{}.tsx", mode.component_name())
}

/// Served pages smaller than this are treated as error stubs.
pub const MIN_PAGE_BYTES: usize = 200;

/// Words that identify the served page as the generated app, besides a `<title>` tag.
pub fn page_markers(mode: Mode) -> [&'static str; 3] {
    ["Modern.js", "Module Federation", mode.project_name()]
}
