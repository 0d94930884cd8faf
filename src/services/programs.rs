// SPDX-License-Identifier: GPL-3.0-or-later

//! Program service.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::services::require_text;
use crate::store::models::{Deleted, Program, Updated};
use crate::store::{self, Collection, Store};

/// Fields for a new program.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProgram {
    /// Name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Code of the managing employee.
    pub manager_code: String,
}

/// Partial update of a program.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgramPatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// Code of the new manager.
    #[serde(default)]
    pub manager_code: Option<String>,
}

/// Program operations over a [`Store`].
pub struct Programs<'a> {
    store: &'a Store,
}

impl<'a> Programs<'a> {
    pub(crate) const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// All programs ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn all(&self) -> Result<Vec<Program>> {
        self.store.call(|conn| list(conn)).await
    }

    /// Looks up one program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn by_code(&self, code: &str) -> Result<Program> {
        self.store.call(|conn| find(conn, code)).await
    }

    /// Creates a program with the next `P` code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown manager and
    /// [`Error::Constraint`] if that employee already manages a program.
    pub async fn create(&self, new: NewProgram) -> Result<Program> {
        self.store
            .call(move |conn| {
                let tx = conn.transaction()?;
                let program = insert(&tx, &new)?;
                tx.commit()?;
                Ok(program)
            })
            .await
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::Validation`] for an empty patch,
    /// or [`Error::Constraint`] if the new manager already has a program.
    pub async fn update(&self, code: &str, patch: ProgramPatch) -> Result<Updated<Program>> {
        if patch.name.is_none() && patch.description.is_none() && patch.manager_code.is_none() {
            return Err(Error::Validation("no fields to update".to_string()));
        }
        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }

        self.store
            .call(move |conn| {
                let previous = find(conn, code)?;
                let manager_id = match &patch.manager_code {
                    Some(manager_code) => {
                        Some(available_manager(conn, manager_code, Some(&previous.id))?)
                    }
                    None => None,
                };
                conn.execute(
                    "UPDATE programs SET
                        name = COALESCE(?1, name),
                        description = COALESCE(?2, description),
                        manager_id = COALESCE(?3, manager_id),
                        updated_at = ?4
                     WHERE id = ?5",
                    params![
                        patch.name.as_deref().map(str::trim),
                        patch.description,
                        manager_id,
                        store::now(),
                        previous.id,
                    ],
                )?;
                let current = find(conn, code)?;
                Ok(Updated::new(previous, current))
            })
            .await
    }

    /// Looks up a program that is about to be deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn ensure_deletable(&self, code: &str) -> Result<Program> {
        self.by_code(code).await
    }

    /// Deletes a program together with its contracts and their tasks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn delete(&self, code: &str) -> Result<Deleted<Program>> {
        self.store
            .call(|conn| {
                let tx = conn.transaction()?;
                let program = find(&tx, code)?;
                let mut cascaded = codes(
                    &tx,
                    "SELECT code FROM contracts WHERE program_id = ?1 ORDER BY code",
                    &program.id,
                    Collection::Contracts,
                )?;
                cascaded.extend(codes(
                    &tx,
                    "SELECT t.code FROM tasks t JOIN contracts c ON c.id = t.contract_id
                     WHERE c.program_id = ?1 ORDER BY t.code",
                    &program.id,
                    Collection::Tasks,
                )?);
                tx.execute("DELETE FROM programs WHERE id = ?1", [&program.id])?;
                tx.commit()?;
                Ok(Deleted {
                    record: program,
                    cascaded,
                    linked_tasks: Vec::new(),
                })
            })
            .await
    }
}

pub(crate) fn list(conn: &Connection) -> Result<Vec<Program>> {
    let sql = format!("{} ORDER BY p.code", Program::SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], Program::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn find(conn: &Connection, code: &str) -> Result<Program> {
    let sql = format!("{} WHERE p.code = ?1", Program::SELECT);
    conn.query_row(&sql, [code], Program::from_row)
        .optional()?
        .ok_or_else(|| Error::not_found("Program", code))
}

pub(crate) fn insert(conn: &Connection, new: &NewProgram) -> Result<Program> {
    require_text("name", &new.name)?;
    let manager_id = available_manager(conn, &new.manager_code, None)?;

    let code = store::next_code(conn, Collection::Programs)?;
    conn.execute(
        "INSERT INTO programs (id, code, name, description, manager_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            store::new_id(),
            code,
            new.name.trim(),
            new.description,
            manager_id,
            store::now()
        ],
    )?;
    find(conn, &code)
}

/// Resolves a manager code, failing if the employee already manages a
/// program other than `except_program`.
fn available_manager(
    conn: &Connection,
    manager_code: &str,
    except_program: Option<&str>,
) -> Result<String> {
    let manager_id = store::id_for_code(conn, Collection::Employees, manager_code)?;
    let existing: Option<(String, String)> = conn
        .query_row(
            "SELECT id, code FROM programs WHERE manager_id = ?1",
            [&manager_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    match existing {
        Some((program_id, program_code)) if Some(program_id.as_str()) != except_program => {
            Err(Error::Constraint(format!(
                "Employee {manager_code} already manages program {program_code}"
            )))
        }
        _ => Ok(manager_id),
    }
}

fn codes(
    conn: &Connection,
    sql: &str,
    id: &str,
    collection: Collection,
) -> Result<Vec<(Collection, String)>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([id], |row| row.get::<_, String>(0))?
        .map(|code| code.map(|code| (collection, code)))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Services;
    use anyhow::Result;
    use std::sync::Arc;

    async fn seeded() -> Result<Services> {
        let store = Arc::new(Store::open_in_memory()?);
        store.seed().await?;
        Ok(Services::new(store))
    }

    #[tokio::test]
    async fn test_seeded_programs_resolve_managers() -> Result<()> {
        let services = seeded().await?;
        let programs = services.programs().all().await?;
        let managers: Vec<_> = programs.iter().map(|p| p.manager_code.as_str()).collect();
        assert_eq!(managers, ["E001", "E005"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_manager_can_only_run_one_program() -> Result<()> {
        let services = seeded().await?;
        let err = services
            .programs()
            .create(NewProgram {
                name: "Second Front".to_string(),
                description: None,
                manager_code: "E001".to_string(),
            })
            .await;
        assert!(matches!(err, Err(Error::Constraint(_))), "got {err:?}");
        assert_eq!(services.store().count(Collection::Programs).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_reassign_manager() -> Result<()> {
        let services = seeded().await?;
        let updated = services
            .programs()
            .update(
                "P001",
                ProgramPatch {
                    manager_code: Some("E002".to_string()),
                    ..ProgramPatch::default()
                },
            )
            .await?;
        assert_eq!(updated.current.manager_code, "E002");

        // Keeping the same manager is not a conflict with itself.
        services
            .programs()
            .update(
                "P001",
                ProgramPatch {
                    manager_code: Some("E002".to_string()),
                    ..ProgramPatch::default()
                },
            )
            .await?;

        // E001 no longer manages anything and can be deleted.
        services.employees().delete("E001").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cascades() -> Result<()> {
        let services = seeded().await?;
        let deleted = services.programs().delete("P001").await?;

        assert_eq!(
            deleted.cascaded,
            vec![
                (Collection::Contracts, "C001".to_string()),
                (Collection::Contracts, "C002".to_string()),
                (Collection::Tasks, "T001".to_string()),
                (Collection::Tasks, "T002".to_string()),
                (Collection::Tasks, "T003".to_string()),
                (Collection::Tasks, "T004".to_string()),
                (Collection::Tasks, "T005".to_string()),
            ]
        );
        assert_eq!(services.store().count(Collection::Contracts).await?, 1);
        assert_eq!(services.store().count(Collection::Tasks).await?, 2);
        Ok(())
    }
}
