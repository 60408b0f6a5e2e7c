//! Request classification and media file streaming.
//!
//! Every accepted connection is classified from its peeked request line.
//! Media requests bypass hyper and are answered by [`direct`] on a blocking
//! socket; catalog and static requests go through the axum router.

pub mod direct;
pub mod range;

use std::path::{Component, Path, PathBuf};

use kino_common::paths::is_video_file;

pub use direct::handle_media_connection;
pub use range::{parse_range_header, ByteRange, RangeError};

/// Well-known path of the catalog snapshot.
pub const CATALOG_PATH: &str = "/library.json";

/// How a connection's response body is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Catalog,
    Media,
    Static,
}

impl Route {
    /// Classify a request target (path plus optional query).
    pub fn classify(target: &str) -> Self {
        let path = strip_query(target);
        if path == CATALOG_PATH {
            return Route::Catalog;
        }
        match urlencoding::decode(path) {
            Ok(decoded) if is_video_file(Path::new(decoded.as_ref())) => Route::Media,
            _ => Route::Static,
        }
    }

    /// Classify a connection from the first bytes of its request.
    ///
    /// Anything that does not parse as a request line falls through to
    /// [`Route::Static`], where hyper produces the error response.
    pub fn classify_peek(peek_buf: &[u8]) -> Self {
        match request_target(peek_buf) {
            Some(target) => Route::classify(target),
            None => Route::Static,
        }
    }
}

/// Extract the request target from a peeked request line.
fn request_target(peek_buf: &[u8]) -> Option<&str> {
    let line_end = peek_buf
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(peek_buf.len());
    let line = std::str::from_utf8(&peek_buf[..line_end]).ok()?;

    let mut parts = line.split(' ');
    let _method = parts.next().filter(|m| !m.is_empty())?;
    parts.next().filter(|t| t.starts_with('/'))
}

fn strip_query(target: &str) -> &str {
    target.split(['?', '#']).next().unwrap_or(target)
}

/// Maps URL paths onto files.
///
/// Paths below `/<web_video_dir>/` address `source_root` directly, so media
/// is reachable even without the on-disk link; everything else is relative
/// to `serve_root`.
#[derive(Debug, Clone)]
pub struct MediaRoot {
    pub serve_root: PathBuf,
    pub web_video_dir: String,
    pub source_root: PathBuf,
}

impl MediaRoot {
    pub fn new(
        serve_root: impl Into<PathBuf>,
        web_video_dir: impl Into<String>,
        source_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            serve_root: serve_root.into(),
            web_video_dir: web_video_dir.into().trim_matches('/').to_string(),
            source_root: source_root.into(),
        }
    }

    /// Resolve a request target to a file path.
    ///
    /// Returns `None` for targets that are not absolute, do not decode to
    /// UTF-8, or try to leave their root.
    pub fn resolve(&self, target: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(strip_query(target)).ok()?;
        let relative = decoded.strip_prefix('/')?;

        if Path::new(relative)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }

        let media_prefix = format!("{}/", self.web_video_dir);
        match relative.strip_prefix(&media_prefix) {
            Some(rest) if !rest.is_empty() => Some(self.source_root.join(rest)),
            _ => Some(self.serve_root.join(relative)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> MediaRoot {
        MediaRoot::new("/srv/kino", "videos/", "/mnt/usb")
    }

    #[test]
    fn classify_paths() {
        assert_eq!(Route::classify("/library.json"), Route::Catalog);
        assert_eq!(Route::classify("/library.json?t=1"), Route::Catalog);
        assert_eq!(
            Route::classify("/videos/Movies/Action/My_Clip.mp4"),
            Route::Media
        );
        assert_eq!(Route::classify("/videos/a.MKV?start=1"), Route::Media);
        assert_eq!(Route::classify("/videos/My%20Clip.webm"), Route::Media);
        assert_eq!(Route::classify("/index.html"), Route::Static);
        assert_eq!(Route::classify("/covers/My Clip_1.jpg"), Route::Static);
        assert_eq!(Route::classify("/"), Route::Static);
    }

    #[test]
    fn classify_peeked_request_lines() {
        assert_eq!(
            Route::classify_peek(b"GET /videos/a.mp4 HTTP/1.1\r\nHost: x\r\n"),
            Route::Media
        );
        assert_eq!(
            Route::classify_peek(b"POST /videos/a.mp4 HTTP/1.1\r\n"),
            Route::Media
        );
        assert_eq!(
            Route::classify_peek(b"GET /library.json HTTP/1.1\r\n"),
            Route::Catalog
        );
        // Truncated peek still carries the target.
        assert_eq!(Route::classify_peek(b"GET /videos/a.mp4 HT"), Route::Media);
        assert_eq!(Route::classify_peek(b"\x16\x03\x01garbage"), Route::Static);
        assert_eq!(Route::classify_peek(b""), Route::Static);
    }

    #[test]
    fn resolves_media_onto_source_root() {
        assert_eq!(
            root().resolve("/videos/Movies/Action/My_Clip.mp4"),
            Some(PathBuf::from("/mnt/usb/Movies/Action/My_Clip.mp4"))
        );
        assert_eq!(
            root().resolve("/videos/Filme/Drama/Der%20Film.mkv?x=1"),
            Some(PathBuf::from("/mnt/usb/Filme/Drama/Der Film.mkv"))
        );
    }

    #[test]
    fn resolves_other_paths_onto_serve_root() {
        assert_eq!(
            root().resolve("/covers/My%20Clip_1.jpg"),
            Some(PathBuf::from("/srv/kino/covers/My Clip_1.jpg"))
        );
        assert_eq!(
            root().resolve("/videosfoo/a.mp4"),
            Some(PathBuf::from("/srv/kino/videosfoo/a.mp4"))
        );
    }

    #[test]
    fn rejects_traversal() {
        assert_eq!(root().resolve("/videos/../etc/passwd"), None);
        assert_eq!(root().resolve("/videos/%2e%2e/%2e%2e/etc/passwd"), None);
        assert_eq!(root().resolve("/../secret.mp4"), None);
        assert_eq!(root().resolve("videos/a.mp4"), None);
    }
}
