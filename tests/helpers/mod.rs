#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Isolated HOME / working directory, so no user configuration leaks in.
pub fn sandbox() -> TempDir {
    TempDir::new().unwrap()
}

/// Build a CLI command with HOME and the working directory set to `tmp`.
#[allow(deprecated)]
pub fn cli_with_home(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("connector-lens").unwrap();
    cmd.env("HOME", tmp.path());
    cmd.env_remove("RUST_LOG");
    cmd.current_dir(tmp.path());
    cmd
}

pub fn fixture(kind: &str, name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(kind)
        .join(name)
}

pub fn dictionary(name: &str) -> String {
    fixture("dictionaries", name).to_string_lossy().to_string()
}

pub fn corpus(name: &str) -> String {
    fixture("corpus", name).to_string_lossy().to_string()
}

pub fn lexicon(name: &str) -> String {
    fixture("lexicons", name).to_string_lossy().to_string()
}

/// Run a command expected to succeed and parse its stdout as JSON.
pub fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout should be valid JSON")
}
