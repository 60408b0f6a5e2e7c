//! # kino-av
//!
//! Media inspection for the kino catalog.
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find ffmpeg and ffprobe, either
//!   from configured paths or on `PATH`.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Extraction** ([`Extractor`], [`FfmpegExtractor`]) -- duration probing
//!   and preview frame capture for newly discovered files.

pub mod command;
pub mod extractor;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use extractor::{frame_plan, Extractor, FfmpegExtractor, FrameSlot, ThumbnailTarget};
pub use tools::{ToolInfo, ToolRegistry, ToolsConfig};
