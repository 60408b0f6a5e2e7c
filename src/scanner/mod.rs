//! Library synchronizer.
//!
//! Reconciles the `movies` table with a `<group>/<category>/<file>` tree in
//! two strictly sequential passes: the walk inserts new files and touches
//! known ones, then the prune deletes rows whose file is gone. Only files the
//! catalog has never seen reach the [`Extractor`].

mod link;

pub use link::{ensure_media_link, LinkStatus};

use anyhow::{Context, Result};
use kino_av::Extractor;
use kino_common::paths::{
    clean_title, is_orphan_artifact, is_video_file, logical_path, resolve_logical_path,
};
use kino_db::{
    models::NewMovie,
    pool::{get_conn, DbPool},
    queries::movies,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::LibraryConfig;

/// Counters for one synchronizer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Video files visited by the walk.
    pub seen: usize,
    pub added: usize,
    pub touched: usize,
    pub pruned: usize,
    pub orphans_removed: usize,
    /// Non-video files ignored by the walk.
    pub skipped: usize,
}

pub struct Synchronizer {
    pool: DbPool,
    extractor: Arc<dyn Extractor>,
    library: LibraryConfig,
}

impl Synchronizer {
    pub fn new(pool: DbPool, extractor: Arc<dyn Extractor>, library: LibraryConfig) -> Self {
        Self {
            pool,
            extractor,
            library,
        }
    }

    /// Run a full synchronization, stamping every seen row with `now`.
    ///
    /// Fails only if the source root cannot be listed or the store is
    /// unusable; per-file problems are logged and skipped.
    pub async fn run(&self, now: i64) -> Result<SyncReport> {
        let root = &self.library.source_root;
        info!("Synchronizing library at {:?}", root);

        let mut report = SyncReport::default();

        for group in subdirectories(root)
            .with_context(|| format!("Cannot read library root {:?}", root))?
        {
            let categories = match subdirectories(&group) {
                Ok(dirs) => dirs,
                Err(e) => {
                    warn!("Skipping unreadable group {:?}: {}", group, e);
                    continue;
                }
            };

            for category in categories {
                self.sync_category(&group, &category, now, &mut report)
                    .await?;
            }
        }

        report.pruned = self.prune()?;
        self.warn_unvisited(now)?;

        info!(
            seen = report.seen,
            added = report.added,
            touched = report.touched,
            pruned = report.pruned,
            orphans_removed = report.orphans_removed,
            skipped = report.skipped,
            "Library synchronized"
        );

        Ok(report)
    }

    async fn sync_category(
        &self,
        group: &Path,
        category: &Path,
        now: i64,
        report: &mut SyncReport,
    ) -> Result<()> {
        let group_name = dir_name(group);
        let category_name = dir_name(category);

        let files = match list_dir(category) {
            Ok(entries) => entries.into_iter().filter(|e| e.file_type().is_file()),
            Err(e) => {
                warn!("Skipping unreadable category {:?}: {}", category, e);
                return Ok(());
            }
        };

        for entry in files {
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().into_owned();

            if is_orphan_artifact(&file_name) {
                match std::fs::remove_file(path) {
                    Ok(()) => {
                        debug!("Removed orphan artifact {:?}", path);
                        report.orphans_removed += 1;
                    }
                    Err(e) => warn!("Failed to remove orphan artifact {:?}: {}", path, e),
                }
                continue;
            }

            if !is_video_file(path) {
                report.skipped += 1;
                continue;
            }

            let Some(logical) =
                logical_path(&self.library.web_video_dir, &self.library.source_root, path)
            else {
                warn!("File {:?} is outside the library root", path);
                continue;
            };
            report.seen += 1;

            if let Some(id) = self.lookup(&logical)? {
                movies::touch(&*get_conn(&self.pool)?, id, now)?;
                report.touched += 1;
                continue;
            }

            let title = clean_title(&file_name);
            info!("New file: {}", logical);

            let duration = self.extractor.probe_duration(path).await;
            let thumbnails = self
                .extractor
                .extract_frames(path, &title, duration, self.library.thumbnail_count)
                .await;

            let movie = NewMovie {
                title,
                logical_path: logical,
                category: category_name.clone(),
                group: group_name.clone(),
                thumbnails,
                duration_secs: duration,
            };
            let upsert = movies::upsert_or_touch(&*get_conn(&self.pool)?, &movie, now)?;
            if upsert.inserted {
                report.added += 1;
            } else {
                report.touched += 1;
            }
        }

        Ok(())
    }

    fn lookup(&self, logical: &str) -> Result<Option<i64>> {
        let conn = get_conn(&self.pool)?;
        Ok(movies::find_id_by_path(&conn, logical)?)
    }

    /// Delete rows whose file no longer exists on disk.
    fn prune(&self) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        let pruned = movies::prune_missing(&conn, |movie| {
            match self.resolve(&movie.logical_path) {
                Some(path) => match path.try_exists() {
                    Ok(exists) => exists,
                    Err(e) => {
                        warn!("Cannot check {:?}, keeping entry: {}", path, e);
                        true
                    }
                },
                None => false,
            }
        })?;

        for movie in &pruned {
            info!("Removed missing file: {}", movie.logical_path);
        }
        Ok(pruned.len())
    }

    /// Rows that survived the prune without being visited point at files the
    /// walk could not reach (unreadable directories, unexpected depth).
    fn warn_unvisited(&self, now: i64) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        let stale = movies::list_unseen_since(&conn, now)?;
        if !stale.is_empty() {
            warn!(
                count = stale.len(),
                "Catalog entries exist on disk but were not visited by this scan"
            );
            for movie in &stale {
                debug!("Not visited: {}", movie.logical_path);
            }
        }
        Ok(())
    }

    fn resolve(&self, logical: &str) -> Option<PathBuf> {
        resolve_logical_path(
            &self.library.web_video_dir,
            &self.library.source_root,
            logical,
        )
    }
}

/// Immediate entries of `dir`, sorted by name, following symlinks.
///
/// Fails only when `dir` itself cannot be read; unreadable children are
/// logged and left out.
fn list_dir(dir: &Path) -> walkdir::Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) if entry.depth() == 1 => entries.push(entry),
            Ok(_) => {}
            Err(e) if e.depth() == 0 => return Err(e),
            Err(e) => warn!("Skipping unreadable entry in {:?}: {}", dir, e),
        }
    }
    Ok(entries)
}

fn subdirectories(dir: &Path) -> walkdir::Result<Vec<PathBuf>> {
    Ok(list_dir(dir)?
        .into_iter()
        .filter(|e| e.file_type().is_dir())
        .map(DirEntry::into_path)
        .collect())
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Current time as unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
