//! Kino-Common: shared error type and path utilities.
//!
//! This crate provides functionality used across kino:
//!
//! - **Error Handling**: a unified error type and result alias
//! - **Path Utilities**: video extension checks, content types, orphan
//!   artifact detection
//! - **Naming**: title and logical-path derivation for catalog entries
//!
//! # Examples
//!
//! ```
//! use kino_common::paths::{clean_title, is_video_file};
//! use std::path::Path;
//!
//! assert!(is_video_file(Path::new("My_Clip.MP4")));
//! assert_eq!(clean_title("My_Clip.mp4"), "My Clip");
//! ```

pub mod error;
pub mod paths;

pub use error::{Error, Result};
