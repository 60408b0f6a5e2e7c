//! Shared test harness for integration tests.
//!
//! [`TestLibrary`] builds a throwaway `<group>/<category>/<file>` tree plus a
//! serve root and config pointing at them. [`StubExtractor`] stands in for
//! ffprobe/ffmpeg and records every call. [`start_server`] runs the real
//! accept loop on a random port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kino::catalog::Snapshot;
use kino::config::Config;
use kino::scanner::{SyncReport, Synchronizer};
use kino::server::{serve, ServerContext};
use kino_av::{frame_plan, Extractor, ThumbnailTarget};
use kino_db::pool::{get_conn, init_pool, DbPool};
use tempfile::TempDir;

/// A library tree, serve root and catalog store inside one temp directory.
pub struct TestLibrary {
    pub dir: TempDir,
    pub config: Config,
    pub pool: DbPool,
}

impl TestLibrary {
    pub fn new() -> Self {
        Self::with_thumbnail_count(2)
    }

    pub fn with_thumbnail_count(count: u32) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let source_root = dir.path().join("usb");
        let serve_root = dir.path().join("www");
        std::fs::create_dir_all(&source_root).unwrap();
        std::fs::create_dir_all(&serve_root).unwrap();

        let mut config = Config::default();
        config.library.source_root = source_root;
        config.library.thumbnail_count = count;
        config.library.db_path = dir.path().join("movies.db");
        config.library.snapshot_path = dir.path().join("library.json");
        config.server.serve_root = serve_root;

        let pool = init_pool(&config.library.db_path)
            .expect("failed to open catalog store");

        Self { dir, config, pool }
    }

    pub fn source_root(&self) -> &Path {
        &self.config.library.source_root
    }

    pub fn serve_root(&self) -> &Path {
        &self.config.server.serve_root
    }

    /// Create `<group>/<category>/<name>` with the given content.
    pub fn add_file(&self, group: &str, category: &str, name: &str, content: &[u8]) -> PathBuf {
        let dir = self.source_root().join(group).join(category);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn synchronizer(&self, extractor: Arc<StubExtractor>) -> Synchronizer {
        Synchronizer::new(self.pool.clone(), extractor, self.config.library.clone())
    }

    pub fn stub_extractor(&self, duration: f64) -> Arc<StubExtractor> {
        Arc::new(StubExtractor::new(duration, self.config.thumbnail_target()))
    }

    pub async fn sync(&self, extractor: &Arc<StubExtractor>, now: i64) -> SyncReport {
        self.synchronizer(extractor.clone())
            .run(now)
            .await
            .expect("sync failed")
    }

    pub fn movies(&self) -> Vec<kino_db::models::Movie> {
        kino_db::queries::movies::list_all(&get_conn(&self.pool).unwrap()).unwrap()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::export(&get_conn(&self.pool).unwrap()).unwrap()
    }
}

/// Extractor double: fixed duration, frames written as tiny placeholder files.
pub struct StubExtractor {
    duration: f64,
    target: ThumbnailTarget,
    probes: AtomicUsize,
    probed: Mutex<Vec<PathBuf>>,
    frame_timestamps: Mutex<Vec<f64>>,
}

impl StubExtractor {
    pub fn new(duration: f64, target: ThumbnailTarget) -> Self {
        Self {
            duration,
            target,
            probes: AtomicUsize::new(0),
            probed: Mutex::new(Vec::new()),
            frame_timestamps: Mutex::new(Vec::new()),
        }
    }

    /// Number of `probe_duration` calls so far.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn probed_files(&self) -> Vec<PathBuf> {
        self.probed.lock().unwrap().clone()
    }

    /// Timestamps of frames actually produced (not reused).
    pub fn frame_timestamps(&self) -> Vec<f64> {
        self.frame_timestamps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    async fn probe_duration(&self, path: &Path) -> f64 {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.probed.lock().unwrap().push(path.to_path_buf());
        self.duration
    }

    async fn extract_frames(
        &self,
        _path: &Path,
        title: &str,
        duration: f64,
        count: u32,
    ) -> Vec<String> {
        std::fs::create_dir_all(&self.target.dir).unwrap();
        let mut frames = Vec::new();
        for slot in frame_plan(&self.target, title, duration, count) {
            if !slot.path.exists() {
                std::fs::write(&slot.path, b"\xFF\xD8\xFF\xD9").unwrap();
                self.frame_timestamps.lock().unwrap().push(slot.timestamp);
            }
            frames.push(slot.public_path);
        }
        frames
    }
}

/// Deterministic, non-repeating-looking file content.
pub fn pattern_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Run the accept loop on a random local port until the test ends.
pub async fn start_server(config: &Config, snapshot: Snapshot) -> SocketAddr {
    start_server_with_chunk_size(config, snapshot, None).await
}

/// Like [`start_server`], overriding the streaming chunk size.
pub async fn start_server_with_chunk_size(
    config: &Config,
    snapshot: Snapshot,
    chunk_size: Option<usize>,
) -> SocketAddr {
    let mut ctx = ServerContext::new(config, snapshot);
    if let Some(chunk_size) = chunk_size {
        ctx.chunk_size = chunk_size;
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind random port");
    let addr = listener.local_addr().expect("failed to get local addr");

    tokio::spawn(serve(listener, ctx, std::future::pending()));

    addr
}
