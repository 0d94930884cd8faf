// SPDX-License-Identifier: GPL-3.0-or-later

//! Database schema and migrations.

use rusqlite::Connection;

use crate::error::Result;
use crate::store::models::Collection;

/// Schema, safe to apply repeatedly.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS code_counters (
    entity_type TEXT PRIMARY KEY,
    current_value INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS employees (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    job_title TEXT NOT NULL,
    email TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS programs (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    manager_id TEXT NOT NULL UNIQUE REFERENCES employees(id) ON DELETE RESTRICT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contracts (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    program_id TEXT NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    completion_value INTEGER NOT NULL DEFAULT 0
        CHECK (completion_value BETWEEN 0 AND 10),
    contract_id TEXT NOT NULL REFERENCES contracts(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS task_assignments (
    id TEXT PRIMARY KEY,
    task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    employee_id TEXT NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (task_id, employee_id)
);

CREATE TABLE IF NOT EXISTS task_tags (
    id TEXT PRIMARY KEY,
    task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (task_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_contracts_program ON contracts(program_id);
CREATE INDEX IF NOT EXISTS idx_tasks_contract ON tasks(contract_id);
CREATE INDEX IF NOT EXISTS idx_assignments_employee ON task_assignments(employee_id);
CREATE INDEX IF NOT EXISTS idx_task_tags_tag ON task_tags(tag_id);
";

/// Applies the schema and makes sure every collection has a counter row.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;

    for collection in Collection::ALL {
        conn.execute(
            "INSERT OR IGNORE INTO code_counters (entity_type, current_value) VALUES (?1, 0)",
            [collection.counter_key()],
        )?;
    }

    Ok(())
}
