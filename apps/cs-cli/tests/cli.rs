// cli.rs — Process-level tests for the claude-setup binary.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn claude_setup() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_claude-setup"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn dry_run_prints_plan_and_writes_nothing() {
    let project = TempDir::new().unwrap();
    let profile = project.path().join("profile.json");
    fs::write(
        &profile,
        r#"{"languages": ["javascript"], "packageManager": "npm", "frameworks": ["react"]}"#,
    )
    .unwrap();

    let output = claude_setup()
        .arg("--dry-run")
        .arg("--output-dir")
        .arg(project.path())
        .arg("--profile")
        .arg(&profile)
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["status"], "no-setup");
    assert_eq!(report["actions"][0]["type"], "create");
    assert_eq!(report["actions"][0]["target"], "full-setup");
    assert_eq!(report["actions"][1]["target"], "documentation");
    let allow = report["document"]["permissions"]["allow"].as_array().unwrap();
    assert!(allow.iter().any(|p| p == "Bash(npm list:*)"));

    assert!(!project.path().join(".claude").exists());
    assert!(!project.path().join("CLAUDE.md").exists());
}

#[test]
fn setup_then_update_with_config_file() {
    let project = TempDir::new().unwrap();
    let config = project.path().join("setup.toml");
    fs::write(&config, "[options]\nnoDocs = true\n").unwrap();

    let status = claude_setup()
        .args(["--quiet", "--language", "typescript,javascript"])
        .arg("--output-dir")
        .arg(project.path())
        .arg("--config")
        .arg(&config)
        .status()
        .unwrap();
    assert!(status.success());

    let settings = project.path().join(".claude/settings.json");
    let document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&settings).unwrap()).unwrap();
    assert_eq!(document["schemaVersion"], "2.0.0");
    assert_eq!(
        document["hooks"]["PostToolUse"][0]["hooks"][0]["command"],
        "npx tsc --noEmit"
    );
    assert!(!project.path().join("docs/parsed-docs.md").exists());

    let status = claude_setup()
        .args(["--quiet", "--update"])
        .arg("--output-dir")
        .arg(project.path())
        .arg("--config")
        .arg(&config)
        .status()
        .unwrap();
    assert!(status.success());

    let backups = fs::read_dir(project.path().join(".claude"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("settings.backup."))
        .count();
    assert_eq!(backups, 1);
}

#[test]
fn unwritable_project_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let not_a_dir = dir.path().join("file.txt");
    fs::write(&not_a_dir, "plain file").unwrap();

    let status = claude_setup()
        .args(["--quiet", "--no-docs"])
        .arg("--output-dir")
        .arg(&not_a_dir)
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}
