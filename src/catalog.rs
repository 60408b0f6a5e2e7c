//! Catalog snapshot exported for the web frontend.
//!
//! The document is a single JSON object `{"movies": [...]}` whose entries
//! mirror the `movies` table. The server holds one immutable snapshot for its
//! whole lifetime and never touches the store.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use kino_db::models::Movie;
use kino_db::queries::movies;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// One exported catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    /// Logical path, relative to the serve root.
    pub file: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub thumbnails: Vec<String>,
    pub duration: f64,
}

impl From<Movie> for CatalogEntry {
    fn from(movie: Movie) -> Self {
        Self {
            title: movie.title,
            file: movie.logical_path,
            category: movie.category,
            kind: movie.group,
            thumbnails: movie.thumbnails,
            duration: movie.duration_secs,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub movies: Vec<CatalogEntry>,
}

impl Snapshot {
    /// Read every row of the store, in id order.
    pub fn export(conn: &Connection) -> Result<Self> {
        let movies = movies::list_all(conn)
            .context("Failed to read catalog")?
            .into_iter()
            .map(CatalogEntry::from)
            .collect();
        Ok(Self { movies })
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Compact JSON. Same bytes as the `/library.json` response body.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize catalog")
    }

    /// Persist as pretty-printed UTF-8 JSON.
    ///
    /// The document is written to a temporary file in the target directory
    /// and renamed into place, so readers never observe a partial file.
    pub fn write_document(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {:?}", dir))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
        serde_json::to_writer_pretty(&mut tmp, self).context("Failed to serialize catalog")?;
        tmp.write_all(b"\n")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to write catalog document {:?}", path))?;

        tracing::info!(entries = self.len(), path = %path.display(), "Catalog document written");
        Ok(())
    }

    pub fn load_document(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog document {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog document {:?}", path))
    }
}
