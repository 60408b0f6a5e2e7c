//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order. A
//! `schema_migrations` table tracks which versions have been applied.

use kino_common::{Error, Result};
use rusqlite::Connection;

/// V1: the catalog table.
///
/// Column names match the fields of the exported catalog document
/// (`file`, `type`), so a row maps onto a catalog entry without renaming.
const V1_MOVIES: &str = r#"
CREATE TABLE IF NOT EXISTS movies (
    id         INTEGER PRIMARY KEY,
    title      TEXT NOT NULL,
    file       TEXT NOT NULL UNIQUE,
    category   TEXT NOT NULL,
    type       TEXT NOT NULL,
    thumbnails TEXT NOT NULL DEFAULT '[]',
    duration   REAL NOT NULL DEFAULT 0.0,
    last_seen  INTEGER NOT NULL
);
"#;

/// V2: index used when reporting entries not seen by the latest scan.
const V2_LAST_SEEN_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_movies_last_seen ON movies(last_seen);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_MOVIES), (2, V2_LAST_SEEN_INDEX)];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction. Returns the
/// number of migrations applied.
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    let mut applied = 0;
    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;

        tracing::debug!(version, "Applied migration");
        applied += 1;
    }

    Ok(applied)
}

/// Latest schema version known to this build.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|&(v, _)| v).unwrap_or(0)
}
