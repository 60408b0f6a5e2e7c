//! r2d2 pool over the catalog's SQLite database.
//!
//! The synchronizer is the only writer; the CLI may read concurrently, so
//! file databases run in WAL mode with a busy timeout.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use kino_common::{Error, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const POOL_SIZE: u32 = 4;

/// Applied to every new connection of a file-backed pool.
const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
                            PRAGMA synchronous = NORMAL;
                            PRAGMA busy_timeout = 5000;";

/// Open (creating if needed) the catalog at `db_path` and bring its schema
/// up to date. A missing parent directory is created.
pub fn init_pool(db_path: impl AsRef<Path>) -> Result<DbPool> {
    let db_path = db_path.as_ref();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path)
        .with_init(|conn| conn.execute_batch(FILE_PRAGMAS));
    let pool = build(manager, &db_path.display().to_string())?;
    tracing::debug!(path = %db_path.display(), "Catalog store ready");
    Ok(pool)
}

/// Private in-memory catalog. Connections of one pool share the database;
/// separate pools never do.
pub fn init_memory_pool() -> Result<DbPool> {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let uri = format!(
        "file:kino_catalog_{}?mode=memory&cache=shared",
        NEXT.fetch_add(1, Ordering::Relaxed)
    );
    build(SqliteConnectionManager::file(&uri), &uri)
}

pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("No catalog connection available: {e}")))
}

fn build(manager: SqliteConnectionManager, label: &str) -> Result<DbPool> {
    let pool = Pool::builder()
        .max_size(POOL_SIZE)
        .build(manager)
        .map_err(|e| Error::database(format!("Cannot open catalog {label}: {e}")))?;

    let applied = migrations::run_migrations(&*get_conn(&pool)?)?;
    if applied > 0 {
        tracing::info!(applied, store = label, "Catalog schema migrated");
    }
    Ok(pool)
}
