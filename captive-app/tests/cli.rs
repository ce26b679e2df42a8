use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn bracket_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("demos")
        .join("bracket.toml")
}

fn captive_joint(workdir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("captive-joint").expect("binary exists");
    cmd.current_dir(workdir.path())
        .env_remove("CAPTIVE_JOINT_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn demo_workpiece_gets_one_joint() {
    let workdir = tempfile::tempdir().unwrap();
    captive_joint(&workdir)
        .assert()
        .success()
        .stdout(predicate::str::contains("内置 T 形接头示例"))
        .stdout(predicate::str::contains("已生成 1 个卡扣连接孔"))
        .stdout(predicate::str::contains("终止面 lid.back"));
}

#[test]
fn bracket_file_uses_its_own_targets() {
    let workdir = tempfile::tempdir().unwrap();
    captive_joint(&workdir)
        .arg("--workpiece")
        .arg(bracket_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("已生成 2 个卡扣连接孔"));
}

#[test]
fn point_without_wall_below_fails_with_invalid_selection() {
    let workdir = tempfile::tempdir().unwrap();
    captive_joint(&workdir)
        .args(["--point", "35,10,15"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Invalid selection"))
        .stdout(predicate::str::contains("side hole"));
}

#[test]
fn short_bolt_override_is_reported() {
    let workdir = tempfile::tempdir().unwrap();
    captive_joint(&workdir)
        .args(["--bolt-length", "7"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("bolt too short"));
}

#[test]
fn config_file_supplies_parameters() {
    let workdir = tempfile::tempdir().unwrap();
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, "[joint]\nnut_width = 1.0").unwrap();

    captive_joint(&workdir)
        .arg("--config")
        .arg(config.path())
        .arg("--check-config")
        .assert()
        .failure()
        .stdout(predicate::str::contains("参数无效"));
}

#[test]
fn unreadable_config_falls_back_to_defaults() {
    let workdir = tempfile::tempdir().unwrap();
    captive_joint(&workdir)
        .args(["--config", "/nonexistent/captive.toml", "--check-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("侧槽总长 18.00"));
}

#[test]
fn missing_workpiece_file_is_an_error() {
    let workdir = tempfile::tempdir().unwrap();
    captive_joint(&workdir)
        .args(["--workpiece", "/nonexistent/workpiece.toml"])
        .assert()
        .failure();
}
