// SPDX-License-Identifier: GPL-3.0-or-later

//! Task service.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::services::{contracts, employees, require_text, tags};
use crate::store::models::{Contract, Deleted, Task, TaskDetails, Updated};
use crate::store::{self, Collection, Store};

/// Highest completion value; tasks are scored 0 to 10.
pub const MAX_COMPLETION: i64 = 10;

/// Fields for a new task.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    /// Name.
    pub name: String,
    /// Completion on a 0 to 10 scale.
    #[serde(default)]
    pub completion_value: i64,
    /// Code of the owning contract.
    pub contract_code: String,
}

/// Partial update of a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New completion value.
    #[serde(default)]
    pub completion_value: Option<i64>,
    /// Move the task to this contract.
    #[serde(default)]
    pub contract_code: Option<String>,
}

/// Task operations over a [`Store`].
pub struct Tasks<'a> {
    store: &'a Store,
}

impl<'a> Tasks<'a> {
    pub(crate) const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// All tasks ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn all(&self) -> Result<Vec<Task>> {
        self.store.call(|conn| list(conn)).await
    }

    /// Looks up one task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn by_code(&self, code: &str) -> Result<Task> {
        self.store.call(|conn| find(conn, code)).await
    }

    /// A task with its assignees and tags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn details(&self, code: &str) -> Result<TaskDetails> {
        self.store
            .call(|conn| {
                let task = find(conn, code)?;
                let employees = employees::for_task(conn, &task.id)?;
                let tags = tags::for_task(conn, &task.id)?;
                Ok(TaskDetails {
                    task,
                    employees,
                    tags,
                })
            })
            .await
    }

    /// Tasks belonging to a contract.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the contract code does not resolve.
    pub async fn by_contract(&self, contract_code: &str) -> Result<(Contract, Vec<Task>)> {
        self.store
            .call(|conn| {
                let contract = contracts::find(conn, contract_code)?;
                let sql = format!("{} WHERE t.contract_id = ?1 ORDER BY t.code", Task::SELECT);
                let mut stmt = conn.prepare(&sql)?;
                let tasks = stmt
                    .query_map([&contract.id], Task::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok((contract, tasks))
            })
            .await
    }

    /// Creates a task with the next `T` code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an out-of-range completion value and
    /// [`Error::NotFound`] for an unknown contract.
    pub async fn create(&self, new: NewTask) -> Result<Task> {
        self.store
            .call(move |conn| {
                let tx = conn.transaction()?;
                let task = insert(&tx, &new)?;
                tx.commit()?;
                Ok(task)
            })
            .await
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or [`Error::Validation`].
    pub async fn update(&self, code: &str, patch: TaskPatch) -> Result<Updated<Task>> {
        if patch.name.is_none()
            && patch.completion_value.is_none()
            && patch.contract_code.is_none()
        {
            return Err(Error::Validation("no fields to update".to_string()));
        }
        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }
        if let Some(value) = patch.completion_value {
            validate_completion(value)?;
        }

        self.store
            .call(move |conn| {
                let previous = find(conn, code)?;
                let contract_id = patch
                    .contract_code
                    .as_deref()
                    .map(|c| store::id_for_code(conn, Collection::Contracts, c))
                    .transpose()?;
                conn.execute(
                    "UPDATE tasks SET
                        name = COALESCE(?1, name),
                        completion_value = COALESCE(?2, completion_value),
                        contract_id = COALESCE(?3, contract_id),
                        updated_at = ?4
                     WHERE id = ?5",
                    params![
                        patch.name.as_deref().map(str::trim),
                        patch.completion_value,
                        contract_id,
                        store::now(),
                        previous.id,
                    ],
                )?;
                let current = find(conn, code)?;
                Ok(Updated::new(previous, current))
            })
            .await
    }

    /// Looks up a task that is about to be deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn ensure_deletable(&self, code: &str) -> Result<Task> {
        self.by_code(code).await
    }

    /// Deletes a task with its assignments and tag links.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn delete(&self, code: &str) -> Result<Deleted<Task>> {
        self.store
            .call(|conn| {
                let task = find(conn, code)?;
                conn.execute("DELETE FROM tasks WHERE id = ?1", [&task.id])?;
                Ok(Deleted::alone(task))
            })
            .await
    }
}

pub(crate) fn list(conn: &Connection) -> Result<Vec<Task>> {
    let sql = format!("{} ORDER BY t.code", Task::SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], Task::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn find(conn: &Connection, code: &str) -> Result<Task> {
    let sql = format!("{} WHERE t.code = ?1", Task::SELECT);
    conn.query_row(&sql, [code], Task::from_row)
        .optional()?
        .ok_or_else(|| Error::not_found("Task", code))
}

/// Codes of the tasks carrying a tag.
pub(crate) fn tagged_with(conn: &Connection, tag_id: &str) -> Result<Vec<String>> {
    linked_codes(
        conn,
        "SELECT t.code FROM tasks t JOIN task_tags tt ON tt.task_id = t.id
         WHERE tt.tag_id = ?1 ORDER BY t.code",
        tag_id,
    )
}

/// Codes of the tasks an employee is assigned to.
pub(crate) fn assigned_to(conn: &Connection, employee_id: &str) -> Result<Vec<String>> {
    linked_codes(
        conn,
        "SELECT t.code FROM tasks t JOIN task_assignments ta ON ta.task_id = t.id
         WHERE ta.employee_id = ?1 ORDER BY t.code",
        employee_id,
    )
}

fn linked_codes(conn: &Connection, sql: &str, id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let codes = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(codes)
}

pub(crate) fn insert(conn: &Connection, new: &NewTask) -> Result<Task> {
    require_text("name", &new.name)?;
    validate_completion(new.completion_value)?;
    let contract_id = store::id_for_code(conn, Collection::Contracts, &new.contract_code)?;

    let code = store::next_code(conn, Collection::Tasks)?;
    conn.execute(
        "INSERT INTO tasks (id, code, name, completion_value, contract_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            store::new_id(),
            code,
            new.name.trim(),
            new.completion_value,
            contract_id,
            store::now()
        ],
    )?;
    find(conn, &code)
}

fn validate_completion(value: i64) -> Result<()> {
    if (0..=MAX_COMPLETION).contains(&value) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "completion_value must be between 0 and {MAX_COMPLETION}, got {value}"
        )))
    }
}
