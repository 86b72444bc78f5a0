//! Configuration module for swiftbackup
//!
//! This module provides configuration management including:
//! - TOML configuration file parsing
//! - Defaults-then-target option layering
//! - Target and backup spec validation

pub mod settings;

pub use settings::{default_template, Config, DEFAULT_CONFIG_FILE};
