//! Kino - media catalog synchronizer and streaming server
//!
//! This library crate exposes the core functionality for integration testing.

pub mod catalog;
pub mod config;
pub mod scanner;
pub mod server;
pub mod streaming;
