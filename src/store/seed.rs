// SPDX-License-Identifier: GPL-3.0-or-later

//! Demo data set.

use rusqlite::Connection;

use crate::error::Result;
use crate::services::contracts::{self, NewContract};
use crate::services::employees::{self, NewEmployee};
use crate::services::programs::{self, NewProgram};
use crate::services::tags::{self, NewTag};
use crate::services::tasks::{self, NewTask};
use crate::store::{self, Collection};

const EMPLOYEES: &[(&str, &str, &str)] = &[
    ("Leia Organa", "Senior Project Manager", "leia.organa@rebellion.com"),
    ("Luke Skywalker", "Lead Developer", "luke.skywalker@jedi.com"),
    ("Padmé Amidala", "UI/UX Designer", "padme.amidala@naboo.gov"),
    ("Han Solo", "DevOps Engineer", "han.solo@millennium-falcon.com"),
    ("Rey Skywalker", "Quality Assurance Lead", "rey.skywalker@resistance.com"),
];

// (name, description, manager code)
const PROGRAMS: &[(&str, &str, &str)] = &[
    (
        "Digital Transformation Initiative",
        "Modernize core systems and processes",
        "E001",
    ),
    (
        "Customer Experience Enhancement",
        "Improve customer-facing applications",
        "E005",
    ),
];

const CONTRACTS: &[(&str, &str, &str)] = &[
    (
        "Core Platform Upgrade",
        "Upgrade legacy platform infrastructure",
        "P001",
    ),
    (
        "Mobile App Development",
        "Build native mobile applications",
        "P001",
    ),
    (
        "Customer Portal Redesign",
        "Redesign the customer self-service portal",
        "P002",
    ),
];

const TAGS: &[&str] = &[
    "Frontend",
    "Backend",
    "Database",
    "API",
    "Testing",
    "DevOps",
    "Security",
    "Performance",
];

// (name, completion, contract code, assignee code, tag names)
const TASKS: &[(&str, i64, &str, &str, &[&str])] = &[
    ("Setup development environment", 10, "C001", "E004", &["DevOps"]),
    ("Design database schema", 8, "C001", "E002", &["Database"]),
    ("Implement user authentication", 5, "C001", "E002", &["Backend", "Security"]),
    ("Create mobile app wireframes", 7, "C002", "E003", &["Frontend"]),
    ("Develop React Native components", 3, "C002", "E002", &["Frontend"]),
    ("Conduct user research", 10, "C003", "E005", &["Testing"]),
    ("Design new portal layout", 6, "C003", "E003", &["Frontend"]),
];

/// Clears every table, resets the code counters and inserts the demo data.
///
/// # Errors
///
/// Returns an error if any statement fails; nothing is committed then.
pub fn load(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        "DELETE FROM task_tags;
         DELETE FROM task_assignments;
         DELETE FROM tasks;
         DELETE FROM contracts;
         DELETE FROM programs;
         DELETE FROM tags;
         DELETE FROM employees;
         UPDATE code_counters SET current_value = 0;",
    )?;

    for &(name, job_title, email) in EMPLOYEES {
        employees::insert(
            &tx,
            &NewEmployee {
                name: name.to_string(),
                job_title: job_title.to_string(),
                email: email.to_string(),
            },
        )?;
    }

    for &(name, description, manager_code) in PROGRAMS {
        programs::insert(
            &tx,
            &NewProgram {
                name: name.to_string(),
                description: Some(description.to_string()),
                manager_code: manager_code.to_string(),
            },
        )?;
    }

    for &(name, description, program_code) in CONTRACTS {
        contracts::insert(
            &tx,
            &NewContract {
                name: name.to_string(),
                description: Some(description.to_string()),
                program_code: program_code.to_string(),
            },
        )?;
    }

    for &name in TAGS {
        tags::insert(
            &tx,
            &NewTag {
                name: name.to_string(),
            },
        )?;
    }

    for &(name, completion_value, contract_code, assignee, tag_names) in TASKS {
        let task = tasks::insert(
            &tx,
            &NewTask {
                name: name.to_string(),
                completion_value,
                contract_code: contract_code.to_string(),
            },
        )?;

        let employee_id = store::id_for_code(&tx, Collection::Employees, assignee)?;
        tx.execute(
            "INSERT INTO task_assignments (id, task_id, employee_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            [store::new_id(), task.id.clone(), employee_id, store::now()],
        )?;

        for tag_name in tag_names {
            tx.execute(
                "INSERT INTO task_tags (id, task_id, tag_id, created_at)
                 SELECT ?1, ?2, id, ?3 FROM tags WHERE name = ?4",
                [store::new_id(), task.id.clone(), store::now(), (*tag_name).to_string()],
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use anyhow::Result;

    #[tokio::test]
    async fn test_seed_codes_and_links() -> Result<()> {
        let store = Store::open_in_memory()?;
        store.seed().await?;

        assert_eq!(
            store.codes(Collection::Employees).await?,
            ["E001", "E002", "E003", "E004", "E005"]
        );
        assert_eq!(
            store.codes(Collection::Tags).await?.last().map(String::as_str),
            Some("TAG008")
        );

        let (assignments, links) = store
            .call(|conn| {
                let a: i64 =
                    conn.query_row("SELECT COUNT(*) FROM task_assignments", [], |r| r.get(0))?;
                let l: i64 = conn.query_row("SELECT COUNT(*) FROM task_tags", [], |r| r.get(0))?;
                Ok((a, l))
            })
            .await?;
        assert_eq!(assignments, 7);
        assert_eq!(links, 8);
        Ok(())
    }

    #[tokio::test]
    async fn test_reseed_resets_counters() -> Result<()> {
        let store = Store::open_in_memory()?;
        store.seed().await?;
        store
            .call(|conn| store::next_code(conn, Collection::Employees))
            .await?;
        store.seed().await?;

        let next = store
            .call(|conn| store::next_code(conn, Collection::Employees))
            .await?;
        assert_eq!(next, "E006");
        Ok(())
    }
}
