//! Library integration tests for deployment and reconciliation.

use std::fs;
use std::path::Path;

use acforge::deploy::{DeployOutcome, Deployer, RunContext};
use acforge::parameters::ParameterSet;
use acforge::state::{file_checksum, ModuleState, StateStore};
use acforge::templates::{template_version, DirectorySource, TemplateSource};
use acforge::ForgeError;
use tempfile::TempDir;

fn template_root(files: &[(&str, &str)]) -> TempDir {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("manifest.yml"), "version: 1\nmappings: []\n").unwrap();
    for (path, content) in files {
        let full = root.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    root
}

struct Run {
    source: DirectorySource,
    checksum: String,
}

impl Run {
    fn open(root: &Path) -> Self {
        let source = DirectorySource::open(root).unwrap();
        let checksum = source.checksum().unwrap();
        Self { source, checksum }
    }

    fn deploy(
        &self,
        target: &Path,
        params: &ParameterSet,
        state: &mut ModuleState,
        dry_run: bool,
    ) -> acforge::deploy::DeploymentResult {
        let assets = self.source.resolve_all().unwrap();
        let ctx = RunContext::new(target, template_version(&self.checksum));
        Deployer::new(&ctx).deploy(&assets, params, state, dry_run)
    }
}

#[test]
fn parameterized_and_union_assets_deploy_together() {
    let root = template_root(&[
        ("templates/A.md", "Hello {{NAME}}\n"),
        ("templates/B.ignore", "y\nz\n"),
    ]);
    let target = TempDir::new().unwrap();
    fs::write(target.path().join("B.ignore"), "x\n").unwrap();
    let run = Run::open(root.path());
    let params = ParameterSet::from_pairs([("NAME", "demo")]);
    let mut state = ModuleState::new(&run.checksum);

    let result = run.deploy(target.path(), &params, &mut state, false);

    assert_eq!(result.record("A.md").unwrap().outcome, DeployOutcome::Written);
    assert_eq!(result.record("B.ignore").unwrap().outcome, DeployOutcome::Merged);
    assert_eq!(
        fs::read_to_string(target.path().join("A.md")).unwrap(),
        "Hello demo\n"
    );
    assert_eq!(
        fs::read_to_string(target.path().join("B.ignore")).unwrap(),
        "x\ny\nz\n"
    );

    assert_eq!(state.files.len(), 2);
    for path in ["A.md", "B.ignore"] {
        let on_disk = file_checksum(&target.path().join(path)).unwrap();
        assert_eq!(state.file(path).map(|e| e.checksum.clone()), on_disk, "{path}");
    }
}

#[test]
fn second_deployment_is_all_unchanged() {
    let root = template_root(&[
        ("templates/docs/README.md", "# {{NAME}}\n"),
        ("templates/.gitignore", "target/\n"),
        ("templates/settings.json", "{\"a\": 1}\n"),
        ("static/scripts/check.sh", "#!/bin/sh\nexit 0\n"),
    ]);
    let target = TempDir::new().unwrap();
    let run = Run::open(root.path());
    let params = ParameterSet::from_pairs([("NAME", "demo")]);
    let mut state = ModuleState::new(&run.checksum);

    run.deploy(target.path(), &params, &mut state, false);
    let snapshot = state.files.clone();
    let second = run.deploy(target.path(), &params, &mut state, false);

    assert!(second.is_success());
    assert_eq!(
        second.count(DeployOutcome::SkippedUnchanged),
        second.records.len()
    );
    assert_eq!(state.files, snapshot);
}

#[test]
fn resolved_output_never_contains_placeholders() {
    let root = template_root(&[(
        "templates/CLAUDE.md",
        "{{PROJECT_NAME}} by {{GITHUB_OWNER}} ({{REPO_URL}})\n",
    )]);
    let target = TempDir::new().unwrap();
    let run = Run::open(root.path());
    let params = ParameterSet::from_pairs([
        ("PROJECT_NAME", "widget"),
        ("GITHUB_OWNER", "acme"),
        ("REPO_URL", "https://github.com/acme/widget"),
    ]);
    let mut state = ModuleState::new(&run.checksum);

    run.deploy(target.path(), &params, &mut state, false);

    let text = fs::read_to_string(target.path().join("CLAUDE.md")).unwrap();
    assert!(!text.contains("{{"));
    assert_eq!(text, "widget by acme (https://github.com/acme/widget)\n");
}

#[test]
fn unresolved_parameter_never_reaches_disk() {
    let root = template_root(&[
        ("templates/A.md", "fine\n"),
        ("templates/B.md", "line one\n{{MISSING}}\n"),
    ]);
    let target = TempDir::new().unwrap();
    let run = Run::open(root.path());
    let mut state = ModuleState::new(&run.checksum);

    let result = run.deploy(target.path(), &ParameterSet::default(), &mut state, false);

    let failed = result.record("B.md").unwrap();
    assert_eq!(failed.outcome, DeployOutcome::Error);
    assert!(failed.reason.as_deref().unwrap().contains("MISSING"));
    assert!(!target.path().join("B.md").exists());
    assert!(state.file("B.md").is_none());
    assert_eq!(result.record("A.md").unwrap().outcome, DeployOutcome::Written);
}

#[test]
fn structured_files_keep_user_keys() {
    let root = template_root(&[(
        "templates/.claude/settings.json",
        "{\"model\": \"default\", \"permissions\": {\"allow\": []}}\n",
    )]);
    let target = TempDir::new().unwrap();
    fs::create_dir_all(target.path().join(".claude")).unwrap();
    fs::write(
        target.path().join(".claude/settings.json"),
        "{\"model\": \"mine\", \"theme\": \"dark\"}\n",
    )
    .unwrap();
    let run = Run::open(root.path());
    let mut state = ModuleState::new(&run.checksum);

    let result = run.deploy(target.path(), &ParameterSet::default(), &mut state, false);

    assert_eq!(
        result.record(".claude/settings.json").unwrap().outcome,
        DeployOutcome::Merged
    );
    let merged: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(target.path().join(".claude/settings.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(merged["model"], "mine");
    assert_eq!(merged["theme"], "dark");
    assert!(merged["permissions"]["allow"].is_array());
}

#[test]
fn structured_keys_removed_locally_are_not_restored() {
    let root = template_root(&[("templates/settings.json", "{\"a\": 1, \"b\": 2}\n")]);
    let target = TempDir::new().unwrap();
    let run = Run::open(root.path());
    let mut state = ModuleState::new(&run.checksum);
    run.deploy(target.path(), &ParameterSet::default(), &mut state, false);

    fs::write(target.path().join("settings.json"), "{\"a\": 1}\n").unwrap();
    let result = run.deploy(target.path(), &ParameterSet::default(), &mut state, false);

    let record = result.record("settings.json").unwrap();
    assert_eq!(record.outcome, DeployOutcome::SkippedUnchanged);
    assert!(record.warnings.iter().any(|w| w.contains("'b'")));
    assert_eq!(
        fs::read_to_string(target.path().join("settings.json")).unwrap(),
        "{\"a\": 1}\n"
    );

    let again = run.deploy(target.path(), &ParameterSet::default(), &mut state, false);
    assert_eq!(
        again.record("settings.json").unwrap().outcome,
        DeployOutcome::SkippedUnchanged
    );
}

#[test]
fn state_survives_a_round_trip_through_disk() {
    let root = template_root(&[("templates/A.md", "a\n")]);
    let target = TempDir::new().unwrap();
    let run = Run::open(root.path());
    let mut state = ModuleState::new(&run.checksum);
    run.deploy(target.path(), &ParameterSet::default(), &mut state, false);

    let store = StateStore::new(target.path());
    store.save(&state).unwrap();
    let loaded = store.load().unwrap().unwrap();

    assert_eq!(loaded.files, state.files);
    assert_eq!(loaded.bundle_checksum, run.checksum);
}

#[test]
fn corrupt_state_is_reported_not_reset() {
    let target = TempDir::new().unwrap();
    fs::create_dir_all(target.path().join(".acforge")).unwrap();
    fs::write(target.path().join(".acforge/state.json"), "[1, 2").unwrap();

    let err = StateStore::new(target.path()).load().unwrap_err();

    assert!(matches!(err, ForgeError::StateCorruption { .. }));
    assert!(err.is_fatal());
    assert_eq!(
        fs::read_to_string(target.path().join(".acforge/state.json")).unwrap(),
        "[1, 2"
    );
}
