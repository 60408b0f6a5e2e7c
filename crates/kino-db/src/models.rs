//! Rust structs mapping to database tables.

/// A tracked media file (one row of `movies`).
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    /// Web-exposed path, unique across the catalog (`file` column).
    pub logical_path: String,
    pub category: String,
    /// Top-level directory name (`type` column).
    pub group: String,
    pub thumbnails: Vec<String>,
    /// Seconds; `0.0` when the duration could not be extracted.
    pub duration_secs: f64,
    /// Unix seconds of the most recent scan that saw the file.
    pub last_seen: i64,
}

impl Movie {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            logical_path: row.get(2)?,
            category: row.get(3)?,
            group: row.get(4)?,
            thumbnails: decode_thumbnails(row, 5)?,
            duration_secs: row.get(6)?,
            last_seen: row.get(7)?,
        })
    }
}

/// Fields supplied by the scanner when a file is seen for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovie {
    pub title: String,
    pub logical_path: String,
    pub category: String,
    pub group: String,
    pub thumbnails: Vec<String>,
    pub duration_secs: f64,
}

/// Thumbnails are stored as a JSON array of relative paths.
pub(crate) fn encode_thumbnails(thumbnails: &[String]) -> String {
    serde_json::to_string(thumbnails).unwrap_or_else(|_| "[]".to_string())
}

fn decode_thumbnails(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
