// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Integration tests for the `reset` and `stats` commands.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

fn run(db: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new(env!("CARGO_BIN_EXE_contract-manager"))
        .arg("--db")
        .arg(db)
        .args(args)
        // Isolate from user-level config
        .env("XDG_CONFIG_HOME", db.parent().context("db has no parent")?)
        .output()
        .context("Failed to run contract-manager")?;
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Maps each collection row of `stats` output to its (count, state).
fn parse_stats(stdout: &str) -> HashMap<String, (usize, String)> {
    stdout
        .lines()
        .skip_while(|l| !l.starts_with("COLLECTION"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?.to_string();
            let count = parts.next()?.parse().ok()?;
            let state = parts.next()?.to_string();
            Some((name, (count, state)))
        })
        .collect()
}

#[test]
fn test_stats_on_fresh_database() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("fresh.sqlite3");

    let stdout = run(&db, &["stats", "--nocolor"])?;
    assert!(!stdout.contains("\x1b["), "nocolor output has escapes");

    let stats = parse_stats(&stdout);
    assert_eq!(stats.len(), 5, "{stdout}");
    for (name, (count, state)) in &stats {
        assert_eq!(*count, 0, "{name}");
        assert_eq!(state, "EMPTY", "{name}");
    }
    Ok(())
}

#[test]
fn test_reset_loads_demo_data() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("reset.sqlite3");

    let stdout = run(&db, &["reset"])?;
    assert!(stdout.contains("Reset"));

    let stats = parse_stats(&run(&db, &["stats", "--nocolor"])?);
    assert_eq!(stats.get("employees"), Some(&(5, "NON_EMPTY".to_string())));
    assert_eq!(stats.get("programs"), Some(&(2, "NON_EMPTY".to_string())));
    assert_eq!(stats.get("contracts"), Some(&(3, "NON_EMPTY".to_string())));
    assert_eq!(stats.get("tasks"), Some(&(7, "NON_EMPTY".to_string())));
    assert_eq!(stats.get("tags"), Some(&(8, "NON_EMPTY".to_string())));

    // A second reset restarts the codes rather than appending.
    run(&db, &["reset"])?;
    let stats = parse_stats(&run(&db, &["stats", "--nocolor"])?);
    assert_eq!(stats.get("tags"), Some(&(8, "NON_EMPTY".to_string())));
    Ok(())
}

#[test]
fn test_version_flag() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_contract-manager"))
        .arg("--version")
        .output()
        .context("Failed to run contract-manager")?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("contract-manager "), "{stdout}");
    Ok(())
}
