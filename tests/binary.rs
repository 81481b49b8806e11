//! Runs the built `tfwrap` binary with `sh` as the wrapped tool.

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tfwrap::common::hooks::GENERATED_FILE_NAME;

const CONFIG: &str = r#"
s3_backend:
  role_arn: arn:aws:iam::111:role/state
  region: us-east-1
  bucket: tf-state
  dynamodb_table: tf-locks
execution:
  - prefix: sub
    aws_execution_role: arn:aws:iam::111:role/x
"#;

fn tfwrap(script: &str, workdir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tfwrap"));
    cmd.args(["-c", script])
        .arg(format!("-chdir={}", workdir.display()))
        .env("TFWRAP_BINARY", "sh")
        .env_remove("TFWRAP_DEBUG")
        .env_remove("TFWRAP_SKIP_EXEC")
        .env_remove("TFWRAP_NO_CLEANUP");
    cmd
}

fn project() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let workdir = tmp.path().join("proj").join("sub");
    fs::create_dir_all(&workdir).unwrap();
    fs::write(tmp.path().join("proj").join("wrapper-config.yml"), CONFIG).unwrap();
    (tmp, workdir)
}

fn wait_for(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !path.exists() {
        assert!(Instant::now() < deadline, "{} never appeared", path.display());
        thread::sleep(Duration::from_millis(20));
    }
}

#[rstest]
#[case(Signal::SIGINT)]
#[case(Signal::SIGTERM)]
fn interrupt_waits_for_child_and_cleans_up(#[case] sig: Signal) {
    let (_tmp, workdir) = project();
    let generated = workdir.join(GENERATED_FILE_NAME);

    let mut child = tfwrap("trap '' INT TERM; sleep 2; exit 3", &workdir)
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    wait_for(&generated);
    thread::sleep(Duration::from_millis(300));
    kill(Pid::from_raw(child.id() as i32), sig).unwrap();

    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(3));
    assert!(!generated.exists());
}

#[test]
fn quiet_on_non_zero_child_exit() {
    let tmp = TempDir::new().unwrap();
    let out = tfwrap("exit 2", tmp.path()).output().unwrap();

    assert_eq!(out.status.code(), Some(2));
    assert_eq!(String::from_utf8_lossy(&out.stderr), "");
}

#[test]
fn quiet_when_child_is_killed() {
    let (_tmp, workdir) = project();
    let out = tfwrap("kill -9 $$", &workdir).output().unwrap();

    assert_eq!(out.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&out.stderr), "");
    assert!(!workdir.join(GENERATED_FILE_NAME).exists());
}

#[test]
fn debug_toggle_reports_child_exit() {
    let tmp = TempDir::new().unwrap();
    let out = tfwrap("exit 2", tmp.path())
        .env("TFWRAP_DEBUG", "true")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("non-zero code: 2"));
}

#[test]
fn config_error_exits_one_with_message() {
    let (tmp, _workdir) = project();
    let other = tmp.path().join("proj").join("other");
    fs::create_dir_all(&other).unwrap();

    let out = tfwrap("exit 0", &other).output().unwrap();

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("'other'"));
}
