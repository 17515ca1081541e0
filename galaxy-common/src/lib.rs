//! # Galaxy Common Library
//!
//! Shared code for Galaxy crates:
//! - Error type and result alias
//! - Configuration loading (CLI → ENV → TOML → defaults)
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
