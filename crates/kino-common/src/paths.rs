//! Path utilities for classifying and naming library files.
//!
//! The scanner uses these to decide which files are media, which are
//! filesystem debris, and how a file is addressed from the web. The server
//! uses the same extension table to pick a `Content-Type`.

use std::path::{Component, Path, PathBuf};

/// List of recognized video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mpeg", "mpg", "webm", "ogv", "m4v"];

/// Prefix of AppleDouble sidecar files that macOS leaves on non-HFS volumes.
pub const ORPHAN_PREFIX: &str = "._";

/// Check if a path has a video file extension (case-insensitive).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use kino_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("movie.mkv")));
/// assert!(is_video_file(Path::new("/path/to/video.MP4")));
/// assert!(!is_video_file(Path::new("cover.jpg")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    extension_lowercase(path)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Content type served for a media file, keyed on its extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use kino_common::paths::content_type_for;
///
/// assert_eq!(content_type_for(Path::new("a.ogv")), "video/ogg");
/// assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
/// ```
pub fn content_type_for(path: &Path) -> &'static str {
    match extension_lowercase(path).as_deref() {
        Some("mp4") => "video/mp4",
        Some("m4v") => "video/m4v",
        Some("mpeg") | Some("mpg") => "video/mpeg",
        Some("webm") => "video/webm",
        Some("ogv") => "video/ogg",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// Whether a file name is a filesystem metadata sidecar rather than media.
pub fn is_orphan_artifact(file_name: &str) -> bool {
    file_name.starts_with(ORPHAN_PREFIX)
}

/// Derive a display title from a file name.
///
/// Underscores become spaces and the final extension is dropped.
///
/// # Examples
///
/// ```
/// use kino_common::paths::clean_title;
///
/// assert_eq!(clean_title("My_Clip.mp4"), "My Clip");
/// assert_eq!(clean_title("Part_1.final.mkv"), "Part 1.final");
/// ```
pub fn clean_title(file_name: &str) -> String {
    let spaced = file_name.replace('_', " ");
    match spaced.rfind('.') {
        Some(idx) if idx > 0 => spaced[..idx].to_string(),
        _ => spaced,
    }
}

/// Build the web-exposed logical path of `file`, which must live under
/// `source_root`.
///
/// Returns `None` if `file` is not inside `source_root`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use kino_common::paths::logical_path;
///
/// let p = logical_path("videos", Path::new("/mnt/usb"), Path::new("/mnt/usb/Movies/Action/a.mp4"));
/// assert_eq!(p.as_deref(), Some("videos/Movies/Action/a.mp4"));
/// ```
pub fn logical_path(web_video_dir: &str, source_root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(source_root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(format!(
        "{}/{}",
        web_video_dir.trim_end_matches('/'),
        parts.join("/")
    ))
}

/// Map a logical path back onto the file it was derived from.
///
/// Returns `None` when the logical path does not start with
/// `web_video_dir/` or tries to climb out of `source_root`.
pub fn resolve_logical_path(
    web_video_dir: &str,
    source_root: &Path,
    logical: &str,
) -> Option<PathBuf> {
    let prefix = format!("{}/", web_video_dir.trim_end_matches('/'));
    let rest = logical.strip_prefix(&prefix)?;
    let relative = Path::new(rest);
    if rest.is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(source_root.join(relative))
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_file() {
        for name in [
            "a.mp4", "a.mkv", "a.mpeg", "a.mpg", "a.webm", "a.ogv", "a.m4v",
        ] {
            assert!(is_video_file(Path::new(name)), "{name}");
        }

        // Case insensitive
        assert!(is_video_file(Path::new("movie.MKV")));
        assert!(is_video_file(Path::new("movie.Mp4")));

        assert!(!is_video_file(Path::new("movie.avi")));
        assert!(!is_video_file(Path::new("cover.jpg")));
        assert!(!is_video_file(Path::new("no_extension")));
        assert!(!is_video_file(Path::new("")));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(Path::new("a.mp4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("a.M4V")), "video/m4v");
        assert_eq!(content_type_for(Path::new("a.mpeg")), "video/mpeg");
        assert_eq!(content_type_for(Path::new("a.mpg")), "video/mpeg");
        assert_eq!(content_type_for(Path::new("a.webm")), "video/webm");
        assert_eq!(content_type_for(Path::new("a.ogv")), "video/ogg");
        assert_eq!(content_type_for(Path::new("a.mkv")), "video/x-matroska");
        assert_eq!(
            content_type_for(Path::new("a")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_orphan_artifacts() {
        assert!(is_orphan_artifact("._My_Clip.mp4"));
        assert!(!is_orphan_artifact("My_Clip.mp4"));
        assert!(!is_orphan_artifact(".hidden.mp4"));
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("My_Clip.mp4"), "My Clip");
        assert_eq!(clean_title("plain.mkv"), "plain");
        assert_eq!(clean_title("__x__.webm"), "  x  ");
        assert_eq!(clean_title("noext"), "noext");
    }

    #[test]
    fn test_logical_path_roundtrip() {
        let root = Path::new("/mnt/usb");
        let file = root.join("Movies").join("Action").join("My_Clip.mp4");
        let logical = logical_path("videos/", root, &file).unwrap();
        assert_eq!(logical, "videos/Movies/Action/My_Clip.mp4");
        assert_eq!(resolve_logical_path("videos", root, &logical), Some(file));
    }

    #[test]
    fn test_logical_path_outside_root() {
        assert!(logical_path("videos", Path::new("/a"), Path::new("/b/c.mp4")).is_none());
        assert!(logical_path("videos", Path::new("/a"), Path::new("/a")).is_none());
    }

    #[test]
    fn test_resolve_rejects_foreign_paths() {
        let root = Path::new("/mnt/usb");
        assert!(resolve_logical_path("videos", root, "media/Movies/a.mp4").is_none());
        assert!(resolve_logical_path("videos", root, "videos/").is_none());
        assert!(resolve_logical_path("videos", root, "videos/../etc/passwd").is_none());
    }
}
