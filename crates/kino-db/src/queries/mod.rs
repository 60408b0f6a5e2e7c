//! Database query modules.
//!
//! - movies: catalog entries keyed by logical path

pub mod movies;
