//! Content validator: nothing left unrendered, and the answers actually landed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::context::ModeContext;
use crate::core::expectations::{MANIFEST, ROUTE_PAGE, SKIPPED_DIRS};
use crate::report::Reporter;

const MAX_REPORTED_HITS: usize = 20;

/// A line still containing template syntax after rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderHit {
    /// Relative to the project directory.
    pub path: PathBuf,
    pub line_no: usize,
    pub line: String,
}

/// Scan every text file under `project_dir`, skipping dependency, VCS, and `extra_skips` dirs.
///
/// Files that are not UTF-8 text are ignored.
pub fn find_placeholders(
    project_dir: &Path,
    pattern: &Regex,
    extra_skips: &[&str],
) -> Result<Vec<PlaceholderHit>> {
    let mut hits = Vec::new();
    let walker = WalkDir::new(project_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry.file_name().to_str().is_some_and(|name| {
                    SKIPPED_DIRS.contains(&name) || extra_skips.contains(&name)
                })
        });
    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", project_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let bytes =
            fs::read(entry.path()).with_context(|| format!("read {}", entry.path().display()))?;
        let Ok(text) = String::from_utf8(bytes) else {
            debug!(path = %entry.path().display(), "skipping non-text file");
            continue;
        };
        let relative = entry
            .path()
            .strip_prefix(project_dir)
            .unwrap_or(entry.path())
            .to_path_buf();
        for (index, line) in text.lines().enumerate() {
            if pattern.is_match(line) {
                hits.push(PlaceholderHit {
                    path: relative.clone(),
                    line_no: index + 1,
                    line: line.trim().to_string(),
                });
            }
        }
    }
    Ok(hits)
}

#[derive(Debug, Deserialize)]
struct Manifest {
    name: Option<String>,
}

/// The `name` field of `package.json`.
pub fn manifest_name(project_dir: &Path) -> Result<String> {
    let path = project_dir.join(MANIFEST);
    let contents = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let manifest: Manifest =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    manifest
        .name
        .ok_or_else(|| anyhow!("{} has no name field", path.display()))
}

/// Whether `file` mentions `identifier` as a whole word.
pub fn references_identifier(file: &Path, identifier: &str) -> Result<bool> {
    let contents = fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let word = Regex::new(&format!(r"\b{}\b", regex::escape(identifier)))
        .context("build identifier regex")?;
    Ok(word.is_match(&contents))
}

/// Run the placeholder scan and the substitution checks; `true` only if all passed.
#[instrument(skip_all, fields(mode = %ctx.mode))]
pub fn validate_content(ctx: &ModeContext<'_>, reporter: &mut Reporter) -> Result<bool> {
    reporter.section(&format!("{}: content", ctx.mode));
    let project_dir = ctx.project_dir();
    let pattern =
        Regex::new(&ctx.config.placeholder_pattern).context("compile placeholder pattern")?;
    let output_dir = ctx.config.package.output_dir.as_str();

    let placeholders_ok = match find_placeholders(&project_dir, &pattern, &[output_dir]) {
        Ok(hits) if hits.is_empty() => reporter.record(true, "no unrendered template placeholders"),
        Ok(hits) => {
            let ok = reporter.record(
                false,
                &format!("{} line(s) still contain template placeholders", hits.len()),
            );
            for hit in hits.iter().take(MAX_REPORTED_HITS) {
                reporter.detail(&format!(
                    "{}:{}: {}",
                    hit.path.display(),
                    hit.line_no,
                    hit.line
                ));
            }
            if hits.len() > MAX_REPORTED_HITS {
                reporter.detail(&format!("... ({} total)", hits.len()));
            }
            ok
        }
        Err(err) => {
            let ok = reporter.record(false, "placeholder scan failed");
            reporter.detail(&format!("{err:#}"));
            ok
        }
    };

    let expected_name = ctx.mode.project_name();
    let name_ok = match manifest_name(&project_dir) {
        Ok(name) => reporter.record(
            name == expected_name,
            &format!("{MANIFEST} name is '{name}' (expected '{expected_name}')"),
        ),
        Err(err) => {
            let ok = reporter.record(false, &format!("{MANIFEST} name unreadable"));
            reporter.detail(&format!("{err:#}"));
            ok
        }
    };

    let component = ctx.mode.component_name();
    let component_ok = match references_identifier(&project_dir.join(ROUTE_PAGE), component) {
        Ok(found) => reporter.record(found, &format!("{ROUTE_PAGE} references {component}")),
        Err(err) => {
            let ok = reporter.record(false, &format!("{ROUTE_PAGE} unreadable"));
            reporter.detail(&format!("{err:#}"));
            ok
        }
    };

    Ok(placeholders_ok && name_ok && component_ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mode::Mode;
    use crate::io::config::DEFAULT_PLACEHOLDER_PATTERN;
    use crate::test_support::TestWorkspace;

    fn default_pattern() -> Regex {
        Regex::new(DEFAULT_PLACEHOLDER_PATTERN).expect("regex")
    }

    #[test]
    fn placeholder_pattern_ignores_jsx_object_literals() {
        let pattern = default_pattern();
        assert!(pattern.is_match("name: '{{ project-name }}'"));
        assert!(pattern.is_match("{{project_name|pascal_case}}"));
        assert!(pattern.is_match("{% if deployment == 'hosted' %}"));
        assert!(!pattern.is_match("<div style={{ padding: 8 }}>"));
        assert!(!pattern.is_match("<div style={{ ...theme.box }}>"));
        assert!(!pattern.is_match("const x = { a: { b: 1 } };"));
        assert!(!pattern.is_match("token: ${{ secrets.NPM_TOKEN }}"));
    }

    #[test]
    fn placeholder_pattern_catches_every_jinja_opener() {
        let pattern = default_pattern();
        for leftover in [
            "{{- project-name }}",
            "{{ project-name -}}",
            "{{ remote.port }}",
            "{{ 'x' }}",
            "{{ 3051 }}",
            "{# comment #}",
            "{{ project-name ~ '-dist' }}",
            "{{ deps[0] }}",
            "{{ upper(project-name) }}",
            "{%- endif %}",
            "name={{ project-name }}",
            "port={{- dev-port }}",
            "url={{ remote.url }}",
        ] {
            assert!(pattern.is_match(leftover), "missed {leftover:?}");
        }
    }

    #[test]
    fn clean_project_passes() {
        let ws = TestWorkspace::new().expect("workspace");
        let ctx = ws.generated(Mode::Containerized).expect("ctx");
        let mut reporter = ws.reporter().expect("reporter");

        assert!(validate_content(&ctx, &mut reporter).expect("content"));
        assert_eq!(reporter.tally().passed, 3);
    }

    #[test]
    fn leftover_placeholder_is_reported_with_location() {
        let ws = TestWorkspace::new().expect("workspace");
        let ctx = ws.generated(Mode::Hosted).expect("ctx");
        fs::write(
            ctx.project_dir().join("README.md"),
            "# title\nRun {{ project-name }} locally.\n",
        )
        .expect("write");
        let mut reporter = ws.reporter().expect("reporter");

        assert!(!validate_content(&ctx, &mut reporter).expect("content"));
        assert_eq!(reporter.tally().failed, 1);
        let transcript = ws.transcript_contents().expect("transcript");
        assert!(transcript.contains("README.md:2: Run {{ project-name }} locally."));
    }

    #[test]
    fn dependency_and_vcs_dirs_are_not_scanned() {
        let ws = TestWorkspace::new().expect("workspace");
        let ctx = ws.generated(Mode::Hosted).expect("ctx");
        for dir in ["node_modules/pkg", ".git", "dist"] {
            let path = ctx.project_dir().join(dir);
            fs::create_dir_all(&path).expect("mkdir");
            fs::write(path.join("file.txt"), "{{ template }}").expect("write");
        }

        let hits = find_placeholders(&ctx.project_dir(), &default_pattern(), &["dist"])
            .expect("scan");
        assert!(hits.is_empty(), "unexpected hits: {hits:?}");
    }

    #[test]
    fn binary_files_are_skipped() {
        let ws = TestWorkspace::new().expect("workspace");
        let ctx = ws.generated(Mode::Hosted).expect("ctx");
        let mut bytes = vec![0xff, 0xfe, 0x00];
        bytes.extend_from_slice(b"{{ name }}");
        fs::write(ctx.project_dir().join("public/logo.png"), bytes).expect("write");

        let hits = find_placeholders(&ctx.project_dir(), &default_pattern(), &[]).expect("scan");
        assert!(hits.is_empty());
    }

    #[test]
    fn wrong_manifest_name_and_missing_component_both_fail() {
        let ws = TestWorkspace::new().expect("workspace");
        let ctx = ws.generated(Mode::Containerized).expect("ctx");
        fs::write(
            ctx.project_dir().join("package.json"),
            "{ \"name\": \"mfe-containerized-app\" }",
        )
        .expect("write");
        fs::write(
            ctx.project_dir().join("src/routes/page.tsx"),
            "export default () => <MfeContainerizedWidgetV2 />;\n",
        )
        .expect("write");
        let mut reporter = ws.reporter().expect("reporter");

        assert!(!validate_content(&ctx, &mut reporter).expect("content"));
        assert_eq!(reporter.tally().failed, 2);
        assert_eq!(reporter.tally().passed, 1);
    }

    #[test]
    fn manifest_without_name_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("package.json"), "{ \"version\": \"1.0.0\" }").expect("write");
        let err = manifest_name(temp.path()).expect_err("no name");
        assert!(err.to_string().contains("no name field"));
    }
}
