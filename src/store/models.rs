// SPDX-License-Identifier: GPL-3.0-or-later

//! Row types and the collection catalogue.

use std::fmt;

use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// One of the five entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Employees (`E001`).
    Employees,
    /// Programs (`P001`).
    Programs,
    /// Contracts (`C001`).
    Contracts,
    /// Tasks (`T001`).
    Tasks,
    /// Tags (`TAG001`).
    Tags,
}

impl Collection {
    /// Every collection, in dependency order.
    pub const ALL: [Self; 5] = [
        Self::Employees,
        Self::Programs,
        Self::Contracts,
        Self::Tasks,
        Self::Tags,
    ];

    /// Code prefix.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Employees => "E",
            Self::Programs => "P",
            Self::Contracts => "C",
            Self::Tasks => "T",
            Self::Tags => "TAG",
        }
    }

    /// Backing table, also the URI segment.
    pub const fn table(self) -> &'static str {
        match self {
            Self::Employees => "employees",
            Self::Programs => "programs",
            Self::Contracts => "contracts",
            Self::Tasks => "tasks",
            Self::Tags => "tags",
        }
    }

    /// Key in `code_counters`.
    pub const fn counter_key(self) -> &'static str {
        match self {
            Self::Employees => "employee",
            Self::Programs => "program",
            Self::Contracts => "contract",
            Self::Tasks => "task",
            Self::Tags => "tag",
        }
    }

    /// Singular display name used in messages.
    pub const fn entity(self) -> &'static str {
        match self {
            Self::Employees => "Employee",
            Self::Programs => "Program",
            Self::Contracts => "Contract",
            Self::Tasks => "Task",
            Self::Tags => "Tag",
        }
    }

    /// Parses a URI segment or table name.
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.table() == segment)
    }

    /// Formats a sequence number as a code, e.g. `TAG007`.
    pub fn format_code(self, sequence: i64) -> String {
        format!("{}{sequence:03}", self.prefix())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// An employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Internal id.
    pub id: String,
    /// Human-readable code.
    pub code: String,
    /// Full name.
    pub name: String,
    /// Job title.
    pub job_title: String,
    /// Email address.
    pub email: String,
}

impl Employee {
    pub(crate) const COLUMNS: &'static str = "e.id, e.code, e.name, e.job_title, e.email";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            job_title: row.get(3)?,
            email: row.get(4)?,
        })
    }
}

/// A program, with its manager's code resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Internal id.
    pub id: String,
    /// Human-readable code.
    pub code: String,
    /// Name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Code of the managing employee.
    pub manager_code: String,
}

impl Program {
    pub(crate) const SELECT: &'static str = "SELECT p.id, p.code, p.name, p.description, e.code \
         FROM programs p JOIN employees e ON e.id = p.manager_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            manager_code: row.get(4)?,
        })
    }
}

/// A contract, with its program's code resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Internal id.
    pub id: String,
    /// Human-readable code.
    pub code: String,
    /// Name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Code of the owning program.
    pub program_code: String,
}

impl Contract {
    pub(crate) const SELECT: &'static str = "SELECT c.id, c.code, c.name, c.description, p.code \
         FROM contracts c JOIN programs p ON p.id = c.program_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            program_code: row.get(4)?,
        })
    }
}

/// A task, with its contract's code resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Internal id.
    pub id: String,
    /// Human-readable code.
    pub code: String,
    /// Name.
    pub name: String,
    /// Completion on a 0 to 10 scale.
    pub completion_value: u8,
    /// Code of the owning contract.
    pub contract_code: String,
}

impl Task {
    pub(crate) const SELECT: &'static str =
        "SELECT t.id, t.code, t.name, t.completion_value, c.code \
         FROM tasks t JOIN contracts c ON c.id = t.contract_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            completion_value: row.get(3)?,
            contract_code: row.get(4)?,
        })
    }
}

/// A task together with its assignees and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    /// The task.
    #[serde(flatten)]
    pub task: Task,
    /// Assigned employees.
    pub employees: Vec<Employee>,
    /// Attached tags.
    pub tags: Vec<Tag>,
}

/// A tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Internal id.
    pub id: String,
    /// Human-readable code.
    pub code: String,
    /// Unique name.
    pub name: String,
}

impl Tag {
    pub(crate) const COLUMNS: &'static str = "g.id, g.code, g.name";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
        })
    }
}

/// Behaviour shared by every entity row.
pub trait Record {
    /// The collection the record lives in.
    const COLLECTION: Collection;

    /// Human-readable code.
    fn code(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;
}

macro_rules! impl_record {
    ($ty:ty, $collection:expr) => {
        impl Record for $ty {
            const COLLECTION: Collection = $collection;

            fn code(&self) -> &str {
                &self.code
            }

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

impl_record!(Employee, Collection::Employees);
impl_record!(Program, Collection::Programs);
impl_record!(Contract, Collection::Contracts);
impl_record!(Task, Collection::Tasks);
impl_record!(Tag, Collection::Tags);

/// Outcome of an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updated<T> {
    /// The record before the update.
    pub previous: T,
    /// The record after the update.
    pub current: T,
    /// Codes of tasks whose resource embeds the record.
    pub linked_tasks: Vec<String>,
}

impl<T> Updated<T> {
    /// An update that no task resource embeds.
    pub const fn new(previous: T, current: T) -> Self {
        Self {
            previous,
            current,
            linked_tasks: Vec::new(),
        }
    }

    /// Records the tasks that embed the updated record.
    #[must_use]
    pub fn linked(mut self, tasks: Vec<String>) -> Self {
        self.linked_tasks = tasks;
        self
    }
}

impl<T: Record> Updated<T> {
    /// Whether the display name changed, which changes collection listings.
    pub fn renamed(&self) -> bool {
        self.previous.name() != self.current.name()
    }
}

/// Outcome of a delete: the removed record plus whatever the cascade took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deleted<T> {
    /// The record as it was before deletion.
    pub record: T,
    /// Records removed by `ON DELETE CASCADE`, as `(collection, code)`.
    pub cascaded: Vec<(Collection, String)>,
    /// Surviving tasks that embedded the record and lost the link.
    pub linked_tasks: Vec<String>,
}

impl<T> Deleted<T> {
    /// A delete with no cascade.
    pub const fn alone(record: T) -> Self {
        Self {
            record,
            cascaded: Vec::new(),
            linked_tasks: Vec::new(),
        }
    }

    /// Records the tasks that lost their link to the deleted record.
    #[must_use]
    pub fn linked(mut self, tasks: Vec<String>) -> Self {
        self.linked_tasks = tasks;
        self
    }

    /// Collections touched by the delete, own collection first.
    pub fn touched(&self) -> Vec<Collection>
    where
        T: Record,
    {
        let mut touched = vec![T::COLLECTION];
        for (collection, _) in &self.cascaded {
            if !touched.contains(collection) {
                touched.push(*collection);
            }
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_code_pads_to_three_digits() {
        assert_eq!(Collection::Employees.format_code(1), "E001");
        assert_eq!(Collection::Tags.format_code(12), "TAG012");
        assert_eq!(Collection::Tasks.format_code(1234), "T1234");
    }

    #[test]
    fn test_from_segment() {
        assert_eq!(Collection::from_segment("tasks"), Some(Collection::Tasks));
        assert_eq!(Collection::from_segment("task"), None);
    }

    fn program() -> Program {
        Program {
            id: "id".to_string(),
            code: "P001".to_string(),
            name: "Digital Transformation Initiative".to_string(),
            description: None,
            manager_code: "E001".to_string(),
        }
    }

    #[test]
    fn test_deleted_touched_dedups() {
        let deleted = Deleted {
            record: program(),
            cascaded: vec![
                (Collection::Contracts, "C001".to_string()),
                (Collection::Tasks, "T001".to_string()),
                (Collection::Tasks, "T002".to_string()),
            ],
            linked_tasks: Vec::new(),
        };
        assert_eq!(
            deleted.touched(),
            vec![Collection::Programs, Collection::Contracts, Collection::Tasks]
        );
    }

    #[test]
    fn test_updated_renamed() {
        let previous = program();
        let mut current = previous.clone();
        current.description = Some("Phase two".to_string());
        let updated = Updated::new(previous.clone(), current.clone());
        assert!(!updated.renamed());

        current.name = "Renamed".to_string();
        assert!(Updated::new(previous, current).renamed());
    }
}
