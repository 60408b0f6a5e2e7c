//! External tool detection.
//!
//! The [`ToolRegistry`] resolves the locations of `ffmpeg` and `ffprobe` once
//! at startup and hands them to the extractor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kino_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tools the registry manages.
const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Optional overrides for tool locations (`[tools]` config section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

impl ToolsConfig {
    fn override_for(&self, name: &str) -> Option<&Path> {
        match name {
            "ffmpeg" => self.ffmpeg_path.as_deref(),
            "ffprobe" => self.ffprobe_path.as_deref(),
            _ => None,
        }
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of `-version` output, if the tool ran.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Registry holding resolved tool paths.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Discover tools, preferring an existing configured path and falling
    /// back to [`which::which`]. Tools that are not found are omitted.
    pub fn discover(config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let resolved = match config.override_for(name) {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(tool = name, path = %p.display(), "Configured tool path does not exist, searching PATH");
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            match resolved {
                Some(path) => {
                    tracing::debug!(tool = name, path = %path.display(), "Found tool");
                    tools.insert(name.to_string(), path);
                }
                None => tracing::debug!(tool = name, "Tool not found"),
            }
        }

        Self { tools }
    }

    /// Registry with explicit paths, bypassing discovery.
    pub fn with_paths(paths: impl IntoIterator<Item = (String, PathBuf)>) -> Self {
        Self {
            tools: paths.into_iter().collect(),
        }
    }

    /// Path of `name`, or [`Error::Tool`] if it was not discovered.
    pub fn require(&self, name: &str) -> Result<&Path> {
        self.tools
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::tool(name, format!("{name} not found; is it installed and in PATH?")))
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Check every known tool and report availability.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(path) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(path),
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
