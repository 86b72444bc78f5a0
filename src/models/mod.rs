//! Core data models for swiftbackup
//!
//! This module contains the data structures that represent the backup
//! domain: snapshots, retention policies, backup specs and targets.

pub mod options;
pub mod snapshot;
pub mod target;

pub use options::RunOptions;
pub use snapshot::Snapshot;
pub use target::{BackupSpec, RetentionPolicy, Target};
