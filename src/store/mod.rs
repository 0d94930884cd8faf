// SPDX-License-Identifier: GPL-3.0-or-later

//! `SQLite`-backed data store.
//!
//! A single [`rusqlite::Connection`] sits behind a `tokio` mutex; callers
//! run synchronous closures against it with [`Store::call`]. Statements are
//! short, so holding the lock across one closure is cheap.

pub mod models;
pub mod schema;
pub mod seed;

use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
pub use models::Collection;

/// Shared handle to the database.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (creating if needed) the database at `path` and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened or migrated.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::from_connection(conn).context("Failed to migrate database")
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `f` with exclusive access to the connection.
    ///
    /// # Errors
    ///
    /// Propagates whatever `f` returns.
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R> + Send,
        R: Send,
    {
        let mut conn = self.conn.lock().await;
        f(&mut conn)
    }

    /// Number of records in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub async fn count(&self, collection: Collection) -> Result<usize> {
        self.call(move |conn| count(conn, collection)).await
    }

    /// Every code in a collection, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn codes(&self, collection: Collection) -> Result<Vec<String>> {
        self.call(move |conn| {
            let sql = format!("SELECT code FROM {} ORDER BY code", collection.table());
            let mut stmt = conn.prepare(&sql)?;
            let codes = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(codes)
        })
        .await
    }

    /// Wipes every table and loads the demo data set.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; the transaction is rolled back.
    pub async fn seed(&self) -> Result<()> {
        self.call(seed::load).await
    }
}

pub(crate) fn count(conn: &Connection, collection: Collection) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
    let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(usize::try_from(n).unwrap_or_default())
}

/// Advances the collection's counter and returns the new code.
///
/// Must run inside the same transaction as the insert that uses the code.
pub(crate) fn next_code(conn: &Connection, collection: Collection) -> Result<String> {
    let value: i64 = conn.query_row(
        "UPDATE code_counters SET current_value = current_value + 1
         WHERE entity_type = ?1 RETURNING current_value",
        [collection.counter_key()],
        |row| row.get(0),
    )?;
    Ok(collection.format_code(value))
}

/// Resolves a code to its internal id.
pub(crate) fn id_for_code(conn: &Connection, collection: Collection, code: &str) -> Result<String> {
    let sql = format!("SELECT id FROM {} WHERE code = ?1", collection.table());
    conn.query_row(&sql, [code], |row| row.get(0))
        .optional()?
        .ok_or_else(|| Error::not_found(collection.entity(), code))
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}
