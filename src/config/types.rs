use kino_av::{ThumbnailTarget, ToolsConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// On-disk location and public prefix of generated preview frames.
    ///
    /// A relative `thumbnail_dir` lives under `serve_root` so the static
    /// handler can serve the frames at the same relative path.
    pub fn thumbnail_target(&self) -> ThumbnailTarget {
        ThumbnailTarget::new(
            self.server.serve_root.join(&self.library.thumbnail_dir),
            self.library.thumbnail_dir.trim_end_matches('/'),
        )
    }

    /// Where the `web_video_dir` link to `source_root` is expected.
    pub fn media_link_path(&self) -> PathBuf {
        self.server.serve_root.join(&self.library.web_video_dir)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Root of the `<group>/<category>/<file>` tree.
    #[serde(default)]
    pub source_root: PathBuf,

    /// Web-exposed name of `source_root`; every logical path starts with it.
    #[serde(default = "default_web_video_dir")]
    pub web_video_dir: String,

    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: String,

    #[serde(default = "default_thumbnail_count")]
    pub thumbnail_count: u32,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

fn default_web_video_dir() -> String {
    "videos".to_string()
}
fn default_thumbnail_dir() -> String {
    "covers".to_string()
}
fn default_thumbnail_count() -> u32 {
    5
}
fn default_db_path() -> PathBuf {
    PathBuf::from("movies.db")
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("library.json")
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::new(),
            web_video_dir: default_web_video_dir(),
            thumbnail_dir: default_thumbnail_dir(),
            thumbnail_count: default_thumbnail_count(),
            db_path: default_db_path(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for non-media paths (frontend, thumbnails, links).
    #[serde(default = "default_serve_root")]
    pub serve_root: PathBuf,

    /// Socket read/write timeout for media connections.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Read size for media bodies, at most [`MAX_CHUNK_SIZE_MIB`].
    #[serde(default = "default_chunk_size_mib")]
    pub chunk_size_mib: usize,
}

/// Largest accepted `chunk_size_mib`; one buffer of this size is held per
/// media connection.
pub const MAX_CHUNK_SIZE_MIB: usize = 64;

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_serve_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_timeout_secs() -> u64 {
    600
}
fn default_chunk_size_mib() -> usize {
    1
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size_mib.clamp(1, MAX_CHUNK_SIZE_MIB) * 1024 * 1024
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            serve_root: default_serve_root(),
            timeout_secs: default_timeout_secs(),
            chunk_size_mib: default_chunk_size_mib(),
        }
    }
}
