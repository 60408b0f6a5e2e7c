mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Locations probed, in order, when no config path is given.
const DEFAULT_PATHS: &[&str] = &[
    "./kino.toml",
    "./config.toml",
    "~/.config/kino/config.toml",
    "/etc/kino/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    tracing::debug!("No config file found, using defaults");
    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.server.timeout_secs == 0 {
        anyhow::bail!("Server timeout cannot be 0");
    }

    if config.server.chunk_size_mib == 0 {
        anyhow::bail!("Chunk size cannot be 0");
    }

    if config.server.chunk_size_mib > MAX_CHUNK_SIZE_MIB {
        anyhow::bail!(
            "Chunk size {} MiB exceeds the maximum of {} MiB",
            config.server.chunk_size_mib,
            MAX_CHUNK_SIZE_MIB
        );
    }

    if config.library.thumbnail_count == 0 {
        anyhow::bail!("Thumbnail count cannot be 0");
    }

    let web_dir = config.library.web_video_dir.trim_matches('/');
    if web_dir.is_empty() || web_dir.contains("..") {
        anyhow::bail!(
            "Invalid web_video_dir: {:?}",
            config.library.web_video_dir
        );
    }

    if !config.library.source_root.exists() {
        tracing::warn!(
            "Library source root does not exist: {:?}",
            config.library.source_root
        );
    }

    Ok(())
}
