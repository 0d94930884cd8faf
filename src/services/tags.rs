// SPDX-License-Identifier: GPL-3.0-or-later

//! Tag service.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::services::{require_text, tasks};
use crate::store::models::{Deleted, Tag, Task, Updated};
use crate::store::{self, Collection, Store};

/// Tag operations over a [`Store`].
pub struct Tags<'a> {
    store: &'a Store,
}

/// Fields for a new tag.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    /// Unique name.
    pub name: String,
}

impl<'a> Tags<'a> {
    pub(crate) const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// All tags ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn all(&self) -> Result<Vec<Tag>> {
        self.store.call(|conn| list(conn)).await
    }

    /// Looks up one tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn by_code(&self, code: &str) -> Result<Tag> {
        self.store.call(|conn| find(conn, code)).await
    }

    /// Creates a tag with the next `TAG` code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Constraint`] if the name is taken.
    pub async fn create(&self, new: NewTag) -> Result<Tag> {
        self.store
            .call(move |conn| {
                let tx = conn.transaction()?;
                let tag = insert(&tx, &new)?;
                tx.commit()?;
                Ok(tag)
            })
            .await
    }

    /// Renames a tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or, if the name is taken by another tag,
    /// [`Error::Constraint`].
    pub async fn update(&self, code: &str, name: &str) -> Result<Updated<Tag>> {
        require_text("name", name)?;
        self.store
            .call(|conn| {
                let previous = find(conn, code)?;
                ensure_name_free(conn, name, Some(&previous.code))?;
                conn.execute(
                    "UPDATE tags SET name = ?1, updated_at = ?2 WHERE id = ?3",
                    params![name.trim(), store::now(), previous.id],
                )?;
                let current = find(conn, code)?;
                let linked = tasks::tagged_with(conn, &current.id)?;
                Ok(Updated::new(previous, current).linked(linked))
            })
            .await
    }

    /// Looks up a tag that is about to be deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn ensure_deletable(&self, code: &str) -> Result<Tag> {
        self.by_code(code).await
    }

    /// Deletes a tag, detaching it from every task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn delete(&self, code: &str) -> Result<Deleted<Tag>> {
        self.store
            .call(|conn| {
                let tx = conn.transaction()?;
                let tag = find(&tx, code)?;
                let linked = tasks::tagged_with(&tx, &tag.id)?;
                tx.execute("DELETE FROM tags WHERE id = ?1", [&tag.id])?;
                tx.commit()?;
                Ok(Deleted::alone(tag).linked(linked))
            })
            .await
    }

    /// Attaches a tag to a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for either code and [`Error::Constraint`]
    /// if the task already carries the tag.
    pub async fn add_to_task(&self, tag_code: &str, task_code: &str) -> Result<(Tag, Task)> {
        self.store
            .call(|conn| {
                let tag = find(conn, tag_code)?;
                let task = tasks::find(conn, task_code)?;
                if link_id(conn, &task.id, &tag.id)?.is_some() {
                    return Err(Error::Constraint(format!(
                        "Task {} is already tagged \"{}\"",
                        task.code, tag.name
                    )));
                }
                conn.execute(
                    "INSERT INTO task_tags (id, task_id, tag_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![store::new_id(), task.id, tag.id, store::now()],
                )?;
                Ok((tag, task))
            })
            .await
    }

    /// Detaches a tag from a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for either code or if the task does not
    /// carry the tag.
    pub async fn remove_from_task(&self, tag_code: &str, task_code: &str) -> Result<(Tag, Task)> {
        self.store
            .call(|conn| {
                let tag = find(conn, tag_code)?;
                let task = tasks::find(conn, task_code)?;
                let Some(id) = link_id(conn, &task.id, &tag.id)? else {
                    return Err(Error::not_found(
                        "Task tag",
                        format!("{}/{}", tag.code, task.code),
                    ));
                };
                conn.execute("DELETE FROM task_tags WHERE id = ?1", [id])?;
                Ok((tag, task))
            })
            .await
    }

    /// Tags attached to a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the task code does not resolve.
    pub async fn by_task(&self, task_code: &str) -> Result<(Task, Vec<Tag>)> {
        self.store
            .call(|conn| {
                let task = tasks::find(conn, task_code)?;
                let tags = for_task(conn, &task.id)?;
                Ok((task, tags))
            })
            .await
    }
}

pub(crate) fn list(conn: &Connection) -> Result<Vec<Tag>> {
    let sql = format!("SELECT {} FROM tags g ORDER BY g.code", Tag::COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], Tag::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn find(conn: &Connection, code: &str) -> Result<Tag> {
    let sql = format!("SELECT {} FROM tags g WHERE g.code = ?1", Tag::COLUMNS);
    conn.query_row(&sql, [code], Tag::from_row)
        .optional()?
        .ok_or_else(|| Error::not_found("Tag", code))
}

pub(crate) fn for_task(conn: &Connection, task_id: &str) -> Result<Vec<Tag>> {
    let sql = format!(
        "SELECT {} FROM tags g JOIN task_tags tt ON tt.tag_id = g.id
         WHERE tt.task_id = ?1 ORDER BY g.code",
        Tag::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([task_id], Tag::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn insert(conn: &Connection, new: &NewTag) -> Result<Tag> {
    require_text("name", &new.name)?;
    ensure_name_free(conn, &new.name, None)?;

    let code = store::next_code(conn, Collection::Tags)?;
    conn.execute(
        "INSERT INTO tags (id, code, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        params![store::new_id(), code, new.name.trim(), store::now()],
    )?;
    find(conn, &code)
}

fn ensure_name_free(conn: &Connection, name: &str, except_code: Option<&str>) -> Result<()> {
    let holder: Option<String> = conn
        .query_row(
            "SELECT code FROM tags WHERE name = ?1",
            [name.trim()],
            |row| row.get(0),
        )
        .optional()?;
    match holder {
        Some(code) if Some(code.as_str()) != except_code => Err(Error::Constraint(format!(
            "A tag named \"{}\" already exists ({code})",
            name.trim()
        ))),
        _ => Ok(()),
    }
}

fn link_id(conn: &Connection, task_id: &str, tag_id: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT id FROM task_tags WHERE task_id = ?1 AND tag_id = ?2",
            [task_id, tag_id],
            |row| row.get(0),
        )
        .optional()?)
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
    async fn test_duplicate_name_is_constraint() -> Result<()> {
        let services = seeded().await?;
        let err = services
            .tags()
            .create(NewTag {
                name: "Backend".to_string(),
            })
            .await;
        assert!(matches!(err, Err(Error::Constraint(_))), "got {err:?}");

        let fresh = services
            .tags()
            .create(NewTag {
                name: "Hyperdrive".to_string(),
            })
            .await?;
        assert_eq!(fresh.code, "TAG009");
        Ok(())
    }

    #[tokio::test]
    async fn test_rename_to_own_name_is_allowed() -> Result<()> {
        let services = seeded().await?;
        let updated = services.tags().update("TAG001", "Frontend").await?;
        assert!(!updated.renamed());

        let err = services.tags().update("TAG001", "Backend").await;
        assert!(matches!(err, Err(Error::Constraint(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_task_tag_links() -> Result<()> {
        let services = seeded().await?;
        let tags = services.tags();

        tags.add_to_task("TAG008", "T002").await?;
        let (_, attached) = tags.by_task("T002").await?;
        let names: Vec<_> = attached.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Database", "Performance"]);

        assert!(matches!(
            tags.add_to_task("TAG008", "T002").await,
            Err(Error::Constraint(_))
        ));
        tags.remove_from_task("TAG008", "T002").await?;
        assert!(matches!(
            tags.remove_from_task("TAG008", "T002").await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_detaches_from_tasks() -> Result<()> {
        let services = seeded().await?;
        let deleted = services.tags().delete("TAG003").await?;
        assert_eq!(deleted.linked_tasks, ["T002"]);
        let (_, attached) = services.tags().by_task("T002").await?;
        assert!(attached.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_rename_reports_tagged_tasks() -> Result<()> {
        let services = seeded().await?;
        let updated = services.tags().update("TAG001", "UI").await?;
        assert!(updated.renamed());
        assert_eq!(updated.linked_tasks, ["T004", "T005", "T007"]);

        let untagged = services
            .tags()
            .create(NewTag {
                name: "Unused".to_string(),
            })
            .await?;
        let updated = services.tags().update(&untagged.code, "Still unused").await?;
        assert!(updated.linked_tasks.is_empty());
        Ok(())
    }
}
