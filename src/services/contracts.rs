// SPDX-License-Identifier: GPL-3.0-or-later

//! Contract service.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::services::require_text;
use crate::store::models::{Contract, Deleted, Updated};
use crate::store::{self, Collection, Store};

/// Fields for a new contract.
#[derive(Debug, Clone, Deserialize)]
pub struct NewContract {
    /// Name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Code of the owning program.
    pub program_code: String,
}

/// Partial update of a contract.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractPatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// Move the contract to this program.
    #[serde(default)]
    pub program_code: Option<String>,
}

/// Contract operations over a [`Store`].
pub struct Contracts<'a> {
    store: &'a Store,
}

impl<'a> Contracts<'a> {
    pub(crate) const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// All contracts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn all(&self) -> Result<Vec<Contract>> {
        self.store.call(|conn| list(conn)).await
    }

    /// Looks up one contract.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn by_code(&self, code: &str) -> Result<Contract> {
        self.store.call(|conn| find(conn, code)).await
    }

    /// Creates a contract with the next `C` code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown program.
    pub async fn create(&self, new: NewContract) -> Result<Contract> {
        self.store
            .call(move |conn| {
                let tx = conn.transaction()?;
                let contract = insert(&tx, &new)?;
                tx.commit()?;
                Ok(contract)
            })
            .await
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for the contract or target program and
    /// [`Error::Validation`] for an empty patch.
    pub async fn update(&self, code: &str, patch: ContractPatch) -> Result<Updated<Contract>> {
        if patch.name.is_none() && patch.description.is_none() && patch.program_code.is_none() {
            return Err(Error::Validation("no fields to update".to_string()));
        }
        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }

        self.store
            .call(move |conn| {
                let previous = find(conn, code)?;
                let program_id = patch
                    .program_code
                    .as_deref()
                    .map(|p| store::id_for_code(conn, Collection::Programs, p))
                    .transpose()?;
                conn.execute(
                    "UPDATE contracts SET
                        name = COALESCE(?1, name),
                        description = COALESCE(?2, description),
                        program_id = COALESCE(?3, program_id),
                        updated_at = ?4
                     WHERE id = ?5",
                    params![
                        patch.name.as_deref().map(str::trim),
                        patch.description,
                        program_id,
                        store::now(),
                        previous.id,
                    ],
                )?;
                let current = find(conn, code)?;
                Ok(Updated::new(previous, current))
            })
            .await
    }

    /// Looks up a contract that is about to be deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn ensure_deletable(&self, code: &str) -> Result<Contract> {
        self.by_code(code).await
    }

    /// Deletes a contract together with its tasks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code does not resolve.
    pub async fn delete(&self, code: &str) -> Result<Deleted<Contract>> {
        self.store
            .call(|conn| {
                let tx = conn.transaction()?;
                let contract = find(&tx, code)?;
                let cascaded = {
                    let mut stmt =
                        tx.prepare("SELECT code FROM tasks WHERE contract_id = ?1 ORDER BY code")?;
                    stmt.query_map([&contract.id], |row| row.get::<_, String>(0))?
                        .map(|code| code.map(|code| (Collection::Tasks, code)))
                        .collect::<rusqlite::Result<Vec<_>>>()?
                };
                tx.execute("DELETE FROM contracts WHERE id = ?1", [&contract.id])?;
                tx.commit()?;
                Ok(Deleted {
                    record: contract,
                    cascaded,
                    linked_tasks: Vec::new(),
                })
            })
            .await
    }
}

pub(crate) fn list(conn: &Connection) -> Result<Vec<Contract>> {
    let sql = format!("{} ORDER BY c.code", Contract::SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], Contract::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn find(conn: &Connection, code: &str) -> Result<Contract> {
    let sql = format!("{} WHERE c.code = ?1", Contract::SELECT);
    conn.query_row(&sql, [code], Contract::from_row)
        .optional()?
        .ok_or_else(|| Error::not_found("Contract", code))
}

pub(crate) fn insert(conn: &Connection, new: &NewContract) -> Result<Contract> {
    require_text("name", &new.name)?;
    let program_id = store::id_for_code(conn, Collection::Programs, &new.program_code)?;

    let code = store::next_code(conn, Collection::Contracts)?;
    conn.execute(
        "INSERT INTO contracts (id, code, name, description, program_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            store::new_id(),
            code,
            new.name.trim(),
            new.description,
            program_id,
            store::now()
        ],
    )?;
    find(conn, &code)
}
