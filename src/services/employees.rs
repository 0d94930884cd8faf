// SPDX-License-Identifier: GPL-3.0-or-later

//! Employee service: CRUD plus task assignments.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::services::{require_text, tasks};
use crate::store::models::{Deleted, Employee, Task, Updated};
use crate::store::{self, Collection, Store};

/// Fields for a new employee.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEmployee {
    /// Full name.
    pub name: String,
    /// Job title.
    pub job_title: String,
    /// Email address.
    pub email: String,
}

/// Partial update of an employee.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeePatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New job title.
    #[serde(default)]
    pub job_title: Option<String>,
    /// New email address.
    #[serde(default)]
    pub email: Option<String>,
}

impl EmployeePatch {
    const fn is_empty(&self) -> bool {
        self.name.is_none() && self.job_title.is_none() && self.email.is_none()
    }
}

/// Employee operations over a [`Store`].
pub struct Employees<'a> {
    store: &'a Store,
}

impl<'a> Employees<'a> {
    pub(crate) const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// All employees ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn all(&self) -> Result<Vec<Employee>> {
        self.store.call(|conn| list(conn)).await
    }

    /// Looks up one employee.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn by_code(&self, code: &str) -> Result<Employee> {
        self.store.call(|conn| find(conn, code)).await
    }

    /// Creates an employee with the next `E` code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for blank fields or a malformed email.
    pub async fn create(&self, new: NewEmployee) -> Result<Employee> {
        self.store
            .call(move |conn| {
                let tx = conn.transaction()?;
                let employee = insert(&tx, &new)?;
                tx.commit()?;
                Ok(employee)
            })
            .await
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown code and
    /// [`Error::Validation`] for an empty or malformed patch.
    pub async fn update(&self, code: &str, patch: EmployeePatch) -> Result<Updated<Employee>> {
        if patch.is_empty() {
            return Err(Error::Validation("no fields to update".to_string()));
        }
        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }
        if let Some(email) = &patch.email {
            validate_email(email)?;
        }

        self.store
            .call(move |conn| {
                let previous = find(conn, code)?;
                conn.execute(
                    "UPDATE employees SET
                        name = COALESCE(?1, name),
                        job_title = COALESCE(?2, job_title),
                        email = COALESCE(?3, email),
                        updated_at = ?4
                     WHERE id = ?5",
                    params![
                        patch.name.as_deref().map(str::trim),
                        patch.job_title.as_deref().map(str::trim),
                        patch.email.as_deref().map(str::trim),
                        store::now(),
                        previous.id,
                    ],
                )?;
                let current = find(conn, code)?;
                let linked = tasks::assigned_to(conn, &current.id)?;
                Ok(Updated::new(previous, current).linked(linked))
            })
            .await
    }

    /// Checks that an employee exists and may be deleted, without deleting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or, while the employee manages a program,
    /// [`Error::Constraint`].
    pub async fn ensure_deletable(&self, code: &str) -> Result<Employee> {
        self.store.call(|conn| deletable(conn, code)).await
    }

    /// Deletes an employee. Their task assignments go with them.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Employees::ensure_deletable`].
    pub async fn delete(&self, code: &str) -> Result<Deleted<Employee>> {
        self.store
            .call(|conn| {
                let tx = conn.transaction()?;
                let employee = deletable(&tx, code)?;
                let linked = tasks::assigned_to(&tx, &employee.id)?;
                tx.execute("DELETE FROM employees WHERE id = ?1", [&employee.id])?;
                tx.commit()?;
                Ok(Deleted::alone(employee).linked(linked))
            })
            .await
    }

    /// Assigns an employee to a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for either code and [`Error::Constraint`]
    /// if the assignment already exists.
    pub async fn assign_to_task(
        &self,
        employee_code: &str,
        task_code: &str,
    ) -> Result<(Employee, Task)> {
        self.store
            .call(|conn| {
                let employee = find(conn, employee_code)?;
                let task = tasks::find(conn, task_code)?;
                if assignment_id(conn, &task.id, &employee.id)?.is_some() {
                    return Err(Error::Constraint(format!(
                        "Employee {} is already assigned to task {}",
                        employee.code, task.code
                    )));
                }
                conn.execute(
                    "INSERT INTO task_assignments (id, task_id, employee_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![store::new_id(), task.id, employee.id, store::now()],
                )?;
                Ok((employee, task))
            })
            .await
    }

    /// Removes an employee from a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for either code or a missing assignment.
    pub async fn remove_from_task(
        &self,
        employee_code: &str,
        task_code: &str,
    ) -> Result<(Employee, Task)> {
        self.store
            .call(|conn| {
                let employee = find(conn, employee_code)?;
                let task = tasks::find(conn, task_code)?;
                let Some(id) = assignment_id(conn, &task.id, &employee.id)? else {
                    return Err(Error::not_found(
                        "Assignment",
                        format!("{}/{}", employee.code, task.code),
                    ));
                };
                conn.execute("DELETE FROM task_assignments WHERE id = ?1", [id])?;
                Ok((employee, task))
            })
            .await
    }

    /// Employees assigned to a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the task code does not resolve.
    pub async fn by_task(&self, task_code: &str) -> Result<(Task, Vec<Employee>)> {
        self.store
            .call(|conn| {
                let task = tasks::find(conn, task_code)?;
                let employees = for_task(conn, &task.id)?;
                Ok((task, employees))
            })
            .await
    }
}

pub(crate) fn list(conn: &Connection) -> Result<Vec<Employee>> {
    let sql = format!("SELECT {} FROM employees e ORDER BY e.code", Employee::COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], Employee::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn find(conn: &Connection, code: &str) -> Result<Employee> {
    let sql = format!("SELECT {} FROM employees e WHERE e.code = ?1", Employee::COLUMNS);
    conn.query_row(&sql, [code], Employee::from_row)
        .optional()?
        .ok_or_else(|| Error::not_found("Employee", code))
}

pub(crate) fn for_task(conn: &Connection, task_id: &str) -> Result<Vec<Employee>> {
    let sql = format!(
        "SELECT {} FROM employees e
         JOIN task_assignments a ON a.employee_id = e.id
         WHERE a.task_id = ?1 ORDER BY e.code",
        Employee::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([task_id], Employee::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn insert(conn: &Connection, new: &NewEmployee) -> Result<Employee> {
    require_text("name", &new.name)?;
    require_text("job_title", &new.job_title)?;
    validate_email(&new.email)?;

    let id = store::new_id();
    let code = store::next_code(conn, Collection::Employees)?;
    let now = store::now();
    conn.execute(
        "INSERT INTO employees (id, code, name, job_title, email, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![id, code, new.name.trim(), new.job_title.trim(), new.email.trim(), now],
    )?;
    find(conn, &code)
}

fn deletable(conn: &Connection, code: &str) -> Result<Employee> {
    let employee = find(conn, code)?;
    let managed: Option<(String, String)> = conn
        .query_row(
            "SELECT code, name FROM programs WHERE manager_id = ?1",
            [&employee.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    if let Some((program_code, program_name)) = managed {
        return Err(Error::Constraint(format!(
            "Cannot delete employee \"{}\" ({}) because they manage program \
             \"{program_name}\" ({program_code}). Reassign the program to another manager first.",
            employee.name, employee.code
        )));
    }
    Ok(employee)
}

fn assignment_id(conn: &Connection, task_id: &str, employee_id: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT id FROM task_assignments WHERE task_id = ?1 AND employee_id = ?2",
            [task_id, employee_id],
            |row| row.get(0),
        )
        .optional()?)
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(Error::Validation(format!("\"{email}\" is not a valid email address"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Services;
    use crate::services::programs::NewProgram;
    use anyhow::Result;
    use std::sync::Arc;

    async fn seeded() -> Result<Services> {
        let store = Arc::new(Store::open_in_memory()?);
        store.seed().await?;
        Ok(Services::new(store))
    }

    fn recruit(name: &str) -> NewEmployee {
        NewEmployee {
            name: name.to_string(),
            job_title: "Pilot".to_string(),
            email: format!("{}@rebellion.com", name.to_lowercase().replace(' ', ".")),
        }
    }

    #[tokio::test]
    async fn test_codes_are_never_reused() -> Result<()> {
        let services = seeded().await?;
        let employees = services.employees();

        let first = employees.create(recruit("Wedge Antilles")).await?;
        assert_eq!(first.code, "E006");
        employees.delete(&first.code).await?;

        let second = employees.create(recruit("Biggs Darklighter")).await?;
        let third = employees.create(recruit("Jyn Erso")).await?;
        assert_eq!(second.code, "E007");
        assert_eq!(third.code, "E008");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_program_manager_is_constraint() -> Result<()> {
        let services = seeded().await?;
        let manager = services.employees().create(recruit("Mon Mothma")).await?;
        let program = services
            .programs()
            .create(NewProgram {
                name: "Alliance Logistics".to_string(),
                description: None,
                manager_code: manager.code.clone(),
            })
            .await?;

        let err = services.employees().delete(&manager.code).await;
        assert!(matches!(err, Err(Error::Constraint(_))), "got {err:?}");

        assert_eq!(services.employees().by_code(&manager.code).await?, manager);
        assert_eq!(services.programs().by_code(&program.code).await?, program);
        Ok(())
    }

    #[tokio::test]
    async fn test_assignment_lifecycle() -> Result<()> {
        let services = seeded().await?;
        let employees = services.employees();

        employees.assign_to_task("E001", "T003").await?;
        let (_, assigned) = employees.by_task("T003").await?;
        let codes: Vec<_> = assigned.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, ["E001", "E002"]);

        let dup = employees.assign_to_task("E001", "T003").await;
        assert!(matches!(dup, Err(Error::Constraint(_))));

        employees.remove_from_task("E001", "T003").await?;
        let missing = employees.remove_from_task("E001", "T003").await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_reports_rename() -> Result<()> {
        let services = seeded().await?;
        let updated = services
            .employees()
            .update(
                "E004",
                EmployeePatch {
                    job_title: Some("Captain".to_string()),
                    ..EmployeePatch::default()
                },
            )
            .await?;
        assert!(!updated.renamed());
        assert_eq!(updated.current.job_title, "Captain");
        assert_eq!(updated.linked_tasks, ["T001"]);

        let empty = services.employees().update("E004", EmployeePatch::default()).await;
        assert!(matches!(empty, Err(Error::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_reports_assigned_tasks() -> Result<()> {
        let services = seeded().await?;
        let deleted = services.employees().delete("E002").await?;
        assert!(deleted.cascaded.is_empty());
        assert_eq!(deleted.linked_tasks, ["T002", "T003", "T005"]);

        let (_, assigned) = services.employees().by_task("T003").await?;
        assert!(assigned.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() -> Result<()> {
        let services = seeded().await?;
        let mut new = recruit("Poe Dameron");
        new.email = "poe".to_string();
        let err = services.employees().create(new).await;
        assert!(matches!(err, Err(Error::Validation(_))));
        assert_eq!(services.store().count(Collection::Employees).await?, 5);
        Ok(())
    }
}
