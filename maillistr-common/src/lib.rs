//! # maillistr Common Library
//!
//! Shared code for the maillistr service and its management commands:
//! - Error type
//! - Configuration loading
//! - Storage schema, models and queries
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
