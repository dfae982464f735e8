//! # AnimalSpeak Common Library
//!
//! Shared code for the AnimalSpeak ingestion tools:
//! - Error type
//! - TOML configuration model and resolution
//! - Logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
