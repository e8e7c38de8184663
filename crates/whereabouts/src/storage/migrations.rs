//! Schema versioning for the storage database.
//!
//! The base tables come from `SCHEMA_STATEMENTS`. Each entry in
//! `MIGRATIONS` then moves the database one version forward inside its own
//! transaction, and the version reached is recorded in the metadata table.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// A single schema step: the version it produces and the SQL it runs.
struct Migration {
    version: i32,
    description: &'static str,
    sql: &'static str,
}

/// Ordered schema steps. Versions must be contiguous starting at 1.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "base local storage tables",
    sql: "",
}];

/// The schema version this build writes.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Create the base tables and bring the schema up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if schema creation or a migration fails, or if the
/// database was written by a newer build.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > version) {
        apply(conn, migration)?;
    }
    Ok(())
}

/// Read the recorded schema version; 0 for a fresh database.
fn schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    debug!(
        version = migration.version,
        "Applying migration: {}", migration.description
    );
    let tx = conn.unchecked_transaction()?;
    if !migration.sql.trim().is_empty() {
        tx.execute_batch(migration.sql)?;
    }
    tx.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, migration.version.to_string()),
    )?;
    tx.commit()?;
    info!(version = migration.version, "Storage schema migrated");
    Ok(())
}
