//! Catalog queries, keyed by logical path.
//!
//! The scanner is the only writer. Every mutating function here completes
//! (and commits) before it returns, so a phase of a scan never leaves
//! partial state behind for the next phase.

use kino_common::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{encode_thumbnails, Movie, NewMovie};

const COLS: &str = "id, title, file, category, type, thumbnails, duration, last_seen";

/// Outcome of [`upsert_or_touch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upsert {
    pub id: i64,
    /// `false` when the logical path already existed and was only touched.
    pub inserted: bool,
}

/// Insert `movie` if its logical path is unseen, otherwise only refresh
/// `last_seen` on the existing row.
pub fn upsert_or_touch(conn: &Connection, movie: &NewMovie, now: i64) -> Result<Upsert> {
    if let Some(id) = find_id_by_path(conn, &movie.logical_path)? {
        touch(conn, id, now)?;
        return Ok(Upsert {
            id,
            inserted: false,
        });
    }

    conn.execute(
        "INSERT INTO movies (title, file, category, type, thumbnails, duration, last_seen)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            movie.title,
            movie.logical_path,
            movie.category,
            movie.group,
            encode_thumbnails(&movie.thumbnails),
            movie.duration_secs,
            now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Upsert {
        id: conn.last_insert_rowid(),
        inserted: true,
    })
}

/// Look up the surrogate id for a logical path.
pub fn find_id_by_path(conn: &Connection, logical_path: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM movies WHERE file = ?1",
        [logical_path],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Get a full row by logical path.
pub fn get_by_path(conn: &Connection, logical_path: &str) -> Result<Option<Movie>> {
    conn.query_row(
        &format!("SELECT {COLS} FROM movies WHERE file = ?1"),
        [logical_path],
        Movie::from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Refresh `last_seen` for an existing row.
pub fn touch(conn: &Connection, id: i64, now: i64) -> Result<()> {
    let affected = conn
        .execute(
            "UPDATE movies SET last_seen = ?1 WHERE id = ?2",
            params![now, id],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if affected == 0 {
        return Err(Error::not_found("movie", id));
    }
    Ok(())
}

/// Delete every row for which `exists` returns `false`.
///
/// All deletions happen in one transaction; the removed rows are returned.
pub fn prune_missing<F>(conn: &Connection, mut exists: F) -> Result<Vec<Movie>>
where
    F: FnMut(&Movie) -> bool,
{
    let doomed: Vec<Movie> = list_all(conn)?
        .into_iter()
        .filter(|movie| !exists(movie))
        .collect();

    if doomed.is_empty() {
        return Ok(doomed);
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    {
        let mut stmt = tx
            .prepare("DELETE FROM movies WHERE id = ?1")
            .map_err(|e| Error::database(e.to_string()))?;
        for movie in &doomed {
            stmt.execute([movie.id])
                .map_err(|e| Error::database(e.to_string()))?;
        }
    }
    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    Ok(doomed)
}

/// Rows whose `last_seen` predates `scan_time`.
pub fn list_unseen_since(conn: &Connection, scan_time: i64) -> Result<Vec<Movie>> {
    query_movies(
        conn,
        &format!("SELECT {COLS} FROM movies WHERE last_seen < ?1 ORDER BY id"),
        [scan_time],
    )
}

/// Full read of the catalog, ordered by id.
pub fn list_all(conn: &Connection) -> Result<Vec<Movie>> {
    query_movies(conn, &format!("SELECT {COLS} FROM movies ORDER BY id"), [])
}

/// Number of rows in the catalog.
pub fn count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}

fn query_movies<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Movie>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map(params, Movie::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(rows)
}
