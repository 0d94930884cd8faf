// SPDX-License-Identifier: GPL-3.0-or-later

//! Entity services.
//!
//! Each service resolves human-readable codes to internal ids, checks
//! references before mutating, and leaves the store's constraints as the
//! backstop for races between sessions.

pub mod contracts;
pub mod employees;
pub mod programs;
pub mod tags;
pub mod tasks;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::Store;

pub use contracts::Contracts;
pub use employees::Employees;
pub use programs::Programs;
pub use tags::Tags;
pub use tasks::Tasks;

/// Entry point to the per-entity services.
#[derive(Clone)]
pub struct Services {
    store: Arc<Store>,
}

impl Services {
    /// Wraps a store.
    pub const fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Employee operations.
    pub fn employees(&self) -> Employees<'_> {
        Employees::new(&self.store)
    }

    /// Program operations.
    pub fn programs(&self) -> Programs<'_> {
        Programs::new(&self.store)
    }

    /// Contract operations.
    pub fn contracts(&self) -> Contracts<'_> {
        Contracts::new(&self.store)
    }

    /// Task operations.
    pub fn tasks(&self) -> Tasks<'_> {
        Tasks::new(&self.store)
    }

    /// Tag operations.
    pub fn tags(&self) -> Tags<'_> {
        Tags::new(&self.store)
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
