//! Schema versioning for the slot database.
//!
//! The version lives in the `metadata` table. Each step of [`MIGRATIONS`] runs
//! in its own transaction together with the version bump, so an interrupted
//! upgrade resumes from the last completed step.

use rusqlite::Connection;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// Ordered upgrade steps: target version and the statements that reach it.
const MIGRATIONS: &[(i32, &[&str])] = &[
    // Base tables come from SCHEMA_STATEMENTS
    (1, &[]),
];

/// Schema version a freshly opened database ends up at.
pub const CURRENT_VERSION: i32 = 1;

const VERSION_KEY: &str = "schema_version";

/// Create the base tables and apply pending upgrade steps.
///
/// # Errors
///
/// Returns an error if a statement fails or the stored version is unreadable.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let from = get_schema_version(conn)?;
    if from > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!("database is at version {from}, newer than {CURRENT_VERSION}"),
        });
    }

    for (version, statements) in MIGRATIONS.iter().filter(|(v, _)| *v > from) {
        apply(conn, *version, statements)?;
        tracing::debug!("Slot database upgraded to version {}", version);
    }

    Ok(())
}

/// Stored schema version, 0 for a database that was never versioned.
///
/// # Errors
///
/// Returns an error if the metadata table cannot be queried or holds a
/// non-numeric version.
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let stored: Option<String> = match conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    ) {
        Ok(value) => Some(value),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };

    stored.map_or(Ok(0), |value| {
        value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        })
    })
}

fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for statement in statements {
        tx.execute(statement, [])?;
    }
    tx.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    fn slot_columns(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM pragma_table_info('slots')")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(std::result::Result::ok)
            .collect()
    }

    #[test]
    fn test_initialize_schema_creates_tables() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        for table in ["slots", "metadata"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn test_initialize_schema_sets_version() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_schema_idempotent() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("first init failed");
        initialize_schema(&conn).expect("second init failed");

        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
        assert_eq!(
            slot_columns(&conn)
                .iter()
                .filter(|c| c.as_str() == "updated_at")
                .count(),
            1
        );
    }

    #[test]
    fn test_base_schema_has_updated_at_and_keeps_slots() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();
        assert!(slot_columns(&conn).contains(&"updated_at".to_string()));

        conn.execute(
            "INSERT INTO slots (key, value) VALUES ('poehali_error_logs', '[]')",
            [],
        )
        .unwrap();
        initialize_schema(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), 1);
        let value: String = conn
            .query_row(
                "SELECT value FROM slots WHERE key = 'poehali_error_logs'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(value, "[]");
    }

    #[test]
    fn test_get_schema_version_fresh_db() {
        let conn = create_test_db();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_invalid_schema_version() {
        let conn = create_test_db();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES ('schema_version', 'two')",
            [],
        )
        .unwrap();

        let err = get_schema_version(&conn).unwrap_err();
        assert!(err.to_string().contains("invalid schema version"));
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();
        apply(&conn, CURRENT_VERSION + 1, &[]).unwrap();

        let err = initialize_schema(&conn).unwrap_err();
        assert!(err.to_string().contains("newer than"));
    }

    #[test]
    fn test_migration_table_ends_at_current_version() {
        assert_eq!(MIGRATIONS.last().map(|(v, _)| *v), Some(CURRENT_VERSION));
        assert!(MIGRATIONS.windows(2).all(|w| w[1].0 == w[0].0 + 1));
    }
}
