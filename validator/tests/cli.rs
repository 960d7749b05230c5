//! CLI tests for `archetype-validate`.
//!
//! Spawns the binary with a config override that swaps the render tool for a
//! shell one-liner copying pre-rendered projects, so no real toolchain is needed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use archetype_validator::core::mode::Mode;
use archetype_validator::exit_codes;
use archetype_validator::io::config::{CONFIG_ENV, ValidatorConfig, write_config};
use archetype_validator::test_support::{write_mode_answers, write_project};

/// Copies `<source>/<project-name>` into the destination, like a render would.
const COPY_RENDER: &str =
    "name=$(sed -n 's/^project-name: *//p' \"$1\"); cp -R \"$0/$name\" \"$2/\"";

struct Fixture {
    temp: tempfile::TempDir,
    config: ValidatorConfig,
}

impl Fixture {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let template_dir = root.join("prerendered");
        let answers_dir = root.join("answers");
        fs::create_dir_all(&answers_dir).expect("answers dir");
        for mode in Mode::ALL {
            write_project(&template_dir.join(mode.project_name()), mode).expect("project");
            write_mode_answers(&answers_dir.join(mode.answer_file()), mode).expect("answers");
        }

        let mut config = ValidatorConfig {
            template_dir,
            answers_dir,
            work_base: Some(root.join("work")),
            ..ValidatorConfig::default()
        };
        config.render.command = vec![
            "sh".to_string(),
            "-c".to_string(),
            COPY_RENDER.to_string(),
            "{source}".to_string(),
            "{answers}".to_string(),
            "{dest}".to_string(),
        ];
        Self { temp, config }
    }

    fn run(&self, args: &[&str]) -> Output {
        let config_path = self.temp.path().join("validator.toml");
        write_config(&config_path, &self.config).expect("write config");
        Command::new(env!("CARGO_BIN_EXE_archetype-validate"))
            .args(args)
            .current_dir(self.temp.path())
            .env(CONFIG_ENV, &config_path)
            .env("NO_COLOR", "1")
            .output()
            .expect("run archetype-validate")
    }

    fn work_root(&self) -> PathBuf {
        let work = self.temp.path().join("work");
        let mut roots: Vec<PathBuf> = fs::read_dir(&work)
            .expect("read work")
            .map(|entry| entry.expect("entry").path())
            .collect();
        assert_eq!(roots.len(), 1, "expected exactly one work root");
        roots.remove(0)
    }
}

fn transcript(work_root: &Path) -> String {
    fs::read_to_string(work_root.join("validation.log")).expect("read transcript")
}

#[test]
fn generate_only_succeeds_without_build_steps() {
    let fixture = Fixture::new();

    let output = fixture.run(&["--generate-only"]);

    assert_eq!(
        output.status.code(),
        Some(exit_codes::OK),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let work_root = fixture.work_root();
    for mode in Mode::ALL {
        assert!(
            work_root
                .join(mode.name())
                .join(mode.project_name())
                .join("package.json")
                .is_file()
        );
    }
    let log = transcript(&work_root);
    assert!(!log.contains("FAIL"));
    assert!(!log.contains("pnpm"));
    assert!(log.contains("passed"));
}

#[test]
fn missing_answer_file_exits_with_failure() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.config.answers_dir.join("containerized.yaml")).expect("rm answers");

    let output = fixture.run(&["--generate-only"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let work_root = fixture.work_root();
    assert!(!work_root.join("hosted").exists());
    let log = transcript(&work_root);
    assert!(log.contains("FAIL answer file"));
}

#[test]
fn missing_tools_are_listed_before_any_work() {
    let mut fixture = Fixture::new();
    fixture.config.container.engine = "missing-engine-7731".to_string();
    fixture.config.package.install = vec!["missing-pm-7731".to_string(), "install".to_string()];
    fixture.config.package.build = vec!["missing-pm-7731".to_string(), "build".to_string()];

    let output = fixture.run(&[]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing prerequisites"));
    assert!(stderr.contains("missing-engine-7731 (not found)"));
    assert!(stderr.contains("missing-pm-7731 (not found)"));
    assert_eq!(stderr.matches("missing-pm-7731").count(), 1);
    assert!(!stderr.contains("- sh "));
    assert!(!stderr.contains("ERROR"), "stderr: {stderr}");
    assert!(!fixture.temp.path().join("work").exists());
}
