//! Kino-DB: the catalog store.
//!
//! This crate persists the media catalog in SQLite using rusqlite with r2d2
//! connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use kino_db::pool::{get_conn, init_pool};
//! use kino_db::queries::movies;
//!
//! let pool = init_pool("movies.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! for movie in movies::list_all(&conn).unwrap() {
//!     println!("{} -> {}", movie.title, movie.logical_path);
//! }
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
