// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Integration tests for configuration loading and merging.
//!
//! Verifies that the server picks up settings from files, environment
//! variables and CLI flags in the correct priority order.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, Stdio};

/// Tools that stay listed when every collection is empty.
const ALWAYS_ON: [&str; 6] = [
    "add_employee",
    "create_program",
    "create_contract",
    "create_task",
    "create_tag",
    "run_really_long_task",
];

/// Spawns the server with `configure`, initializes it and returns the names
/// from `tools/list`.
fn listed_tools(home: &Path, configure: impl FnOnce(&mut Command)) -> Result<Vec<String>> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_contract-manager"));
    // Isolate from user-level config
    cmd.env("XDG_CONFIG_HOME", home);
    configure(&mut cmd);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = cmd.spawn().context("Failed to spawn contract-manager")?;
    let mut stdin = child.stdin.take().context("Failed to get stdin")?;
    let mut stdout = BufReader::new(child.stdout.take().context("Failed to get stdout")?);

    let init_req = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "test", "version": "1.0"}
        }
    });
    writeln!(stdin, "{init_req}").context("Failed to write to stdin")?;
    let mut line = String::new();
    stdout.read_line(&mut line).context("Failed to read from stdout")?;
    let response: Value = serde_json::from_str(&line).context("Failed to parse JSON response")?;
    assert!(response.get("result").is_some(), "Init failed: {response:?}");

    let list_req = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"});
    writeln!(stdin, "{list_req}").context("Failed to write to stdin")?;
    line.clear();
    stdout.read_line(&mut line).context("Failed to read from stdout")?;
    let response: Value = serde_json::from_str(&line).context("Failed to parse JSON response")?;

    let _ = child.kill();
    let _ = child.wait();

    let tools = response["result"]["tools"]
        .as_array()
        .context("tools/list returned no array")?;
    Ok(tools
        .iter()
        .filter_map(|t| t["name"].as_str().map(str::to_string))
        .collect())
}

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

#[test]
fn test_config_file_disables_seeding() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("from-file.sqlite3");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!("database = {:?}\nseed_on_start = false\n", db.to_string_lossy()),
    )?;

    let names = listed_tools(dir.path(), |cmd| {
        cmd.arg("--config").arg(&config_path);
    })?;

    let mut expected: Vec<String> = ALWAYS_ON.iter().map(|s| (*s).to_string()).collect();
    expected.sort();
    assert_eq!(sorted(names), expected);
    assert!(db.exists(), "database should be created at the configured path");
    Ok(())
}

#[test]
fn test_env_overrides_config_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "seed_on_start = false\n")?;

    let names = listed_tools(dir.path(), |cmd| {
        cmd.arg("--config").arg(&config_path);
        cmd.arg("--db").arg(dir.path().join("env.sqlite3"));
        cmd.env("CONTRACT_MANAGER_SEED_ON_START", "true");
    })?;

    assert_eq!(names.len(), 33);
    Ok(())
}

#[test]
fn test_no_seed_flag_keeps_existing_data() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("kept.sqlite3");

    // First run seeds, second run keeps what is there.
    let first = listed_tools(dir.path(), |cmd| {
        cmd.arg("--db").arg(&db);
    })?;
    let second = listed_tools(dir.path(), |cmd| {
        cmd.arg("--db").arg(&db).arg("serve").arg("--no-seed");
    })?;
    assert_eq!(sorted(first), sorted(second));

    let fresh = listed_tools(dir.path(), |cmd| {
        cmd.arg("--db")
            .arg(dir.path().join("fresh.sqlite3"))
            .arg("serve")
            .arg("--no-seed");
    })?;
    assert_eq!(fresh.len(), ALWAYS_ON.len());
    Ok(())
}
