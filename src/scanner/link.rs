//! Link exposing the library root inside the serve root.

use std::path::Path;

use tracing::{debug, info, warn};

/// Outcome of [`ensure_media_link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Created,
    /// A symlink was already there; its target is not checked.
    Existing,
    /// Something other than a symlink occupies the path.
    Blocked,
    Failed,
    Unsupported,
}

/// Make `link` a symlink to `source_root` unless something already exists
/// at that path. Never fails; problems are logged.
pub fn ensure_media_link(link: &Path, source_root: &Path) -> LinkStatus {
    match std::fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            debug!("Media link {:?} already present", link);
            LinkStatus::Existing
        }
        Ok(_) => {
            warn!("{:?} exists but is not a symlink; leaving it alone", link);
            LinkStatus::Blocked
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => create_link(link, source_root),
        Err(e) => {
            warn!("Cannot inspect media link {:?}: {}", link, e);
            LinkStatus::Failed
        }
    }
}

#[cfg(unix)]
fn create_link(link: &Path, source_root: &Path) -> LinkStatus {
    // A relative target would be resolved against the link's directory.
    let target = std::fs::canonicalize(source_root).unwrap_or_else(|_| source_root.to_path_buf());

    match std::os::unix::fs::symlink(&target, link) {
        Ok(()) => {
            info!("Created media link {:?} -> {:?}", link, target);
            LinkStatus::Created
        }
        Err(e) => {
            warn!("Failed to create media link {:?}: {}", link, e);
            LinkStatus::Failed
        }
    }
}

#[cfg(not(unix))]
fn create_link(link: &Path, _source_root: &Path) -> LinkStatus {
    warn!("Media links are not supported on this platform: {:?}", link);
    LinkStatus::Unsupported
}
