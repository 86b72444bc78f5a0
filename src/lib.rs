//! swiftbackup - Rotating hard-link snapshot backups
//!
//! This library provides the core functionality for the swiftbackup tool.
//! It creates space-efficient snapshot backups with rsync's `--link-dest`
//! hard-linking and retires old snapshots with generational time-bucket
//! retention (hourly/daily/weekly/monthly/yearly).
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration file parsing and validation
//! - `error`: Custom error types
//! - `models`: Core data models (snapshots, targets, retention policies)
//! - `clock`: Local/UTC time formatting and bucket labels
//! - `catalog`: Snapshot directory scanning
//! - `retention`: The keep/remove classification algorithm
//! - `effect`: Side-effect descriptors and their executor
//! - `planner`: Effect-sequence generators for sync, rotate and alias refresh
//! - `lifecycle`: Per-target locking, action dispatch and error policy
//!
//! # Example
//!
//! ```rust,ignore
//! use swiftbackup::config::Config;
//! use swiftbackup::lifecycle::{run_action, Action};
//! use swiftbackup::models::RunOptions;
//!
//! let config = Config::load(&path)?;
//! let failed = run_action(Action::Status, &options, &targets);
//! ```

pub mod catalog;
pub mod clock;
pub mod config;
pub mod effect;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod planner;
pub mod retention;

pub use error::{BackupError, BackupResult};
