//! # Roster Common Library
//!
//! Shared code for the roster workspace including:
//! - Error types
//! - TOML configuration loading and config path resolution
//! - Tracing subscriber setup
//! - Text normalization used for comparison keys

pub mod config;
pub mod error;
pub mod logging;
pub mod text;

pub use error::{Error, Result};
