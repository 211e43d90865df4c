//! Helpers for tests that run real `/bin/sh` animation scripts.
//!
//! Tests that write a script and then execute it are `#[serial]`: a script
//! still open for writing in a concurrently forked child fails to exec with
//! ETXTBSY.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub const WAVE_ID: &str = "{54DD2975-E192-457D-BCFC-D912A24E33B4}";
pub const HEAT_ID: &str = "{0A1B2C3D-4E5F-4A6B-8C7D-9E0F1A2B3C4D}";

/// Write an executable script into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Declaration lines with every required field.
pub fn header(guid: &str, name: &str) -> Vec<String> {
    vec![
        format!("guid {guid}"),
        format!("name {name}"),
        "version 1.0".to_string(),
        "year 2015".to_string(),
        "author MSC".to_string(),
        "license GPLv2".to_string(),
    ]
}

/// A script that prints `declarations` for `--ckb-info` and otherwise runs
/// `run_body`.
pub fn script(declarations: &[String], run_body: &str) -> String {
    let mut body = String::from("#!/bin/sh\nif [ \"$1\" = \"--ckb-info\" ]; then\n");
    for line in declarations {
        body.push_str(&format!("  echo '{line}'\n"));
    }
    body.push_str("  exit 0\nfi\n");
    body.push_str(run_body);
    body
}

/// Run-mode loop answering every `frame` with one green `esc`; when `log`
/// is given, every received line is appended to it.
pub fn answering_loop(log: Option<&Path>) -> String {
    let log_line = match log {
        Some(path) => format!("  echo \"$line\" >> '{}'\n", path.display()),
        None => String::new(),
    };
    format!(
        "while IFS= read -r line; do\n{log_line}  case \"$line\" in\n    frame*)\n      echo 'begin frame'\n      echo 'argb esc ff00ff00'\n      echo 'end frame'\n      ;;\n  esac\ndone\n"
    )
}
