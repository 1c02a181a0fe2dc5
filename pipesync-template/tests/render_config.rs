use std::fs;
use std::path::PathBuf;

use pipesync_template::{render_config_file, TemplateError};
use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;

const PIPELINE: &str = r#"
resources:
- name: repo
  type: git
  source:
    uri: ${repo_uri}
    branch: ${branch}
jobs:
- name: unit
  plan:
  - get: repo
    trigger: ${auto_trigger}
"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn later_vars_files_override_earlier_ones() {
    let dir = TempDir::new().expect("tmp");
    let config = write(&dir, "pipeline.yml", PIPELINE);
    let common = write(
        &dir,
        "common.yml",
        "repo_uri: https://git.example.com/api.git\nbranch: main\nauto_trigger: false\n",
    );
    let prod = write(&dir, "prod.yml", "branch: release\nauto_trigger: true\n");

    let rendered = render_config_file(&config, &[common, prod]).expect("render");

    assert!(rendered.raw.contains("branch: release"));
    assert_eq!(
        rendered.config["resources"][0]["source"]["uri"],
        json!("https://git.example.com/api.git")
    );
    assert_eq!(rendered.config["jobs"][0]["plan"][0]["trigger"], json!(true));
}

#[test]
fn unresolved_placeholder_is_fatal() {
    let dir = TempDir::new().expect("tmp");
    let config = write(&dir, "pipeline.yml", PIPELINE);
    let partial = write(&dir, "partial.yml", "repo_uri: x\n");

    let err = render_config_file(&config, &[partial]).expect_err("must fail");
    match err {
        TemplateError::Unresolved { names } => {
            assert_eq!(names, vec!["branch".to_string(), "auto_trigger".to_string()])
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn config_without_placeholders_needs_no_vars() {
    let dir = TempDir::new().expect("tmp");
    let config = write(&dir, "plain.yml", "jobs:\n- name: hello\n  plan: []\n");
    let rendered = render_config_file(&config, &[]).expect("render");
    assert_eq!(rendered.config["jobs"][0]["name"], json!("hello"));
}

#[rstest]
#[case("- just\n- a list\n")]
#[case("42\n")]
fn non_mapping_config_is_rejected(#[case] body: &str) {
    let dir = TempDir::new().expect("tmp");
    let config = write(&dir, "bad.yml", body);
    let err = render_config_file(&config, &[]).expect_err("must fail");
    assert!(matches!(err, TemplateError::ConfigNotMapping { .. }));
}

#[test]
fn missing_vars_file_reports_path() {
    let dir = TempDir::new().expect("tmp");
    let config = write(&dir, "pipeline.yml", "jobs: []\n");
    let missing = dir.path().join("nope.yml");
    let err = render_config_file(&config, &[missing.clone()]).expect_err("must fail");
    assert!(err.to_string().contains(&missing.display().to_string()));
}
