// SPDX-License-Identifier: GPL-3.0-or-later

//! Error taxonomy shared by the store, the entity services and the bridge.
//!
//! Cancellation of a progress run and a declined confirmation are not
//! errors; they are ordinary results built by the bridge.

use thiserror::Error;

/// Result type alias using the crate [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Domain errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A code did not resolve to an existing record.
    #[error("{entity} with code \"{code}\" not found")]
    NotFound {
        /// Entity kind, e.g. `Employee`.
        entity: &'static str,
        /// The code that was looked up.
        code: String,
    },

    /// A uniqueness or foreign-key rule would be broken.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Input was out of range or malformed.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The tool exists but is disabled because its collection is empty.
    #[error("Tool '{0}' is disabled")]
    Unavailable(String),

    /// No tool with this name exists.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The URI does not address a resource this server exposes.
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// The mutation committed but refreshing tool availability failed.
    #[error("{committed}, but post-processing failed: {source}")]
    PostCommit {
        /// Description of the committed mutation.
        committed: String,
        /// The availability-check failure.
        #[source]
        source: Box<Error>,
    },

    /// Any other store failure.
    #[error("Database error: {0}")]
    Store(rusqlite::Error),
}

impl Error {
    /// Builds a [`Error::NotFound`].
    pub fn not_found(entity: &'static str, code: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            code: code.into(),
        }
    }

    /// Whether this error should surface as a JSON-RPC protocol error rather
    /// than as an `isError` tool result.
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::UnknownTool(_) | Self::UnknownResource(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(message.unwrap_or_else(|| failure.to_string()))
            }
            other => Self::Store(other),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("Employee", "E042");
        assert_eq!(err.to_string(), "Employee with code \"E042\" not found");
    }

    #[test]
    fn test_sqlite_unique_violation_maps_to_constraint() -> anyhow::Result<()> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")?;
        let err: Error = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .map_err(Error::from)
            .err()
            .ok_or_else(|| anyhow::anyhow!("duplicate insert succeeded"))?;
        assert!(matches!(err, Error::Constraint(_)), "got {err:?}");
        Ok(())
    }

    #[test]
    fn test_other_sqlite_errors_stay_store_errors() -> anyhow::Result<()> {
        let conn = Connection::open_in_memory()?;
        let err: Error = conn
            .execute("SELECT * FROM missing_table", [])
            .map_err(Error::from)
            .err()
            .ok_or_else(|| anyhow::anyhow!("query against missing table succeeded"))?;
        assert!(matches!(err, Error::Store(_)));
        Ok(())
    }

    #[test]
    fn test_post_commit_is_distinct() {
        let err = Error::PostCommit {
            committed: "Employee E006 created".to_string(),
            source: Box::new(Error::Store(rusqlite::Error::InvalidQuery)),
        };
        let text = err.to_string();
        assert!(text.starts_with("Employee E006 created, but post-processing failed"));
        assert!(!err.is_protocol_error());
    }

    #[test]
    fn test_protocol_errors() {
        assert!(Error::Unavailable("get_tag".into()).is_protocol_error());
        assert!(!Error::Validation("bad".into()).is_protocol_error());
    }
}
