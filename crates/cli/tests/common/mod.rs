//! Shared helpers for CLI integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use assert_cmd::cargo;

/// A small customer record: four fields, one repeated.
pub const CUSTOMER: &str = "\
000100 01  CUSTOMER-RECORD.
000200     05  CUST-ID        PIC 9(6).
000300     05  CUST-NAME      PIC X(20).
000400     05  BALANCE        PIC S9(7)V99 COMP-3.
000500     05  ADDR-LINE      PIC X(30) OCCURS 2 TIMES.
";

/// The `copybook` binary.
pub fn copybook_cmd() -> Command {
    Command::new(cargo::cargo_bin!("copybook"))
}

/// Write `content` as `name` inside a fresh temporary directory.
pub fn write_temp_copybook(name: &str, content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write temp copybook");
    (dir, path)
}

/// Run with `args` and parse stdout as JSON.
pub fn run_json(args: &[&str]) -> (Output, serde_json::Value) {
    let output = copybook_cmd()
        .args(args)
        .args(["--output", "json"])
        .output()
        .expect("run copybook");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {stdout}"));
    (output, json)
}
