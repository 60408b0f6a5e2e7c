//! Duration probing and preview frame capture.
//!
//! The synchronizer only talks to the [`Extractor`] trait, so tests can
//! substitute a stub and count invocations. [`FfmpegExtractor`] is the
//! production implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use kino_common::{Error, Result};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Per-frame ffmpeg timeout.
const FRAME_TIMEOUT: Duration = Duration::from_secs(30);

/// Duration probe timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Output frame dimensions.
const FRAME_SIZE: &str = "320x180";

/// Derives media facts for a file the catalog has not seen before.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Duration in seconds, `0.0` when it cannot be determined.
    async fn probe_duration(&self, path: &Path) -> f64;

    /// Capture `count` preview frames of `path` and return the public
    /// paths of every frame that exists afterwards, in index order.
    async fn extract_frames(&self, path: &Path, title: &str, duration: f64, count: u32)
        -> Vec<String>;
}

/// Where preview frames are written and how they are addressed publicly.
#[derive(Debug, Clone)]
pub struct ThumbnailTarget {
    /// Directory on disk.
    pub dir: PathBuf,
    /// Prefix used in the catalog (e.g. `covers`).
    pub public_prefix: String,
}

impl ThumbnailTarget {
    pub fn new(dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.into(),
        }
    }
}

/// One planned preview frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSlot {
    /// 1-based.
    pub index: u32,
    /// Seek position in seconds.
    pub timestamp: f64,
    pub path: PathBuf,
    pub public_path: String,
}

/// Plan `count` frames evenly spaced inside `(0, duration)`.
///
/// Frame `i` (1-based) sits at `duration * i / (count + 1)` and is named
/// `<title>_<i>.jpg`. A non-positive or non-finite duration plans nothing.
pub fn frame_plan(
    target: &ThumbnailTarget,
    title: &str,
    duration: f64,
    count: u32,
) -> Vec<FrameSlot> {
    if !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }

    let prefix = target.public_prefix.trim_end_matches('/');
    (1..=count)
        .map(|index| {
            let name = format!("{title}_{index}.jpg");
            FrameSlot {
                index,
                timestamp: duration * f64::from(index) / f64::from(count + 1),
                path: target.dir.join(&name),
                public_path: format!("{prefix}/{name}"),
            }
        })
        .collect()
}

/// Parse ffprobe's `format=duration` stdout: the last non-empty line.
pub fn parse_duration_output(output: &str) -> Option<f64> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()?
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// [`Extractor`] backed by the ffprobe and ffmpeg executables.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    tools: ToolRegistry,
    target: ThumbnailTarget,
}

impl FfmpegExtractor {
    pub fn new(tools: ToolRegistry, target: ThumbnailTarget) -> Self {
        Self { tools, target }
    }

    async fn try_probe(&self, path: &Path) -> Result<f64> {
        let ffprobe = self.tools.require("ffprobe")?;
        let output = ToolCommand::new(ffprobe.to_path_buf())
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path.to_string_lossy())
            .timeout(PROBE_TIMEOUT)
            .execute()
            .await?;

        for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
            tracing::debug!(path = %path.display(), "ffprobe: {}", line.trim());
        }

        parse_duration_output(&output.stdout).ok_or_else(|| {
            Error::Probe(format!(
                "no usable duration for {}: {:?}",
                path.display(),
                output.stdout.lines().last().unwrap_or_default()
            ))
        })
    }

    async fn capture(&self, path: &Path, slot: &FrameSlot) -> Result<()> {
        let ffmpeg = self.tools.require("ffmpeg")?;
        ToolCommand::new(ffmpeg.to_path_buf())
            .args(["-y", "-ss"])
            .arg(format!("{:.3}", slot.timestamp))
            .arg("-i")
            .arg(path.to_string_lossy())
            .args(["-vframes", "1", "-q:v", "2", "-s", FRAME_SIZE])
            .arg(slot.path.to_string_lossy())
            .timeout(FRAME_TIMEOUT)
            .execute()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Extractor for FfmpegExtractor {
    async fn probe_duration(&self, path: &Path) -> f64 {
        match self.try_probe(path).await {
            Ok(duration) => duration,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not determine duration");
                0.0
            }
        }
    }

    async fn extract_frames(
        &self,
        path: &Path,
        title: &str,
        duration: f64,
        count: u32,
    ) -> Vec<String> {
        let plan = frame_plan(&self.target, title, duration, count);
        if plan.is_empty() {
            tracing::info!(%title, duration, "Skipping thumbnails, invalid duration");
            return Vec::new();
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.target.dir).await {
            tracing::warn!(dir = %self.target.dir.display(), error = %e, "Cannot create thumbnail directory");
            return Vec::new();
        }

        let mut frames = Vec::with_capacity(plan.len());
        for slot in &plan {
            if slot.path.exists() {
                tracing::debug!(frame = %slot.path.display(), "Thumbnail exists, reusing");
                frames.push(slot.public_path.clone());
                continue;
            }

            match self.capture(path, slot).await {
                Ok(()) if slot.path.exists() => {
                    tracing::debug!(frame = %slot.path.display(), "Thumbnail created");
                    frames.push(slot.public_path.clone());
                }
                Ok(()) => {
                    tracing::warn!(frame = %slot.path.display(), "ffmpeg produced no frame");
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), index = slot.index, error = %e, "Thumbnail failed");
                }
            }
        }
        frames
    }
}
