//! Local/UTC time handling for swiftbackup
//!
//! All calendar math in the crate goes through [`Clock`] so that the
//! local-vs-UTC choice is an explicit value threaded through every call
//! instead of process-global state.

use std::fmt::Write as _;

use chrono::{Local, TimeZone, Utc};

use crate::error::{BackupError, BackupResult};

/// Which calendar to use when mapping timestamps to dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeMode {
    /// The machine's local time zone (default)
    #[default]
    Local,
    /// Coordinated universal time
    Utc,
}

/// The five retention granularities, finest first
///
/// The order of [`Granularity::ALL`] is load-bearing: the sync skip guard
/// checks the first *enabled* granularity in exactly this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Granularity {
    /// All granularities, finest first
    pub const ALL: [Granularity; 5] = [
        Granularity::Hourly,
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Yearly,
    ];

    /// The strftime pattern whose rendering labels this granularity's bucket
    fn label_format(self) -> &'static str {
        match self {
            Granularity::Hourly => "%Y-%m-%d %H",
            Granularity::Daily => "%Y-%m-%d",
            Granularity::Weekly => "%Y.%W",
            Granularity::Monthly => "%Y-%m",
            Granularity::Yearly => "%Y",
        }
    }

    /// One-letter marker used by the status table
    pub fn marker(self) -> char {
        match self {
            Granularity::Hourly => 'h',
            Granularity::Daily => 'd',
            Granularity::Weekly => 'w',
            Granularity::Monthly => 'm',
            Granularity::Yearly => 'y',
        }
    }
}

/// Timestamp formatting in either local or UTC calendar
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    mode: TimeMode,
}

impl Clock {
    /// Create a clock for the given time mode
    pub fn new(mode: TimeMode) -> Self {
        Self { mode }
    }

    /// Clock using the local time zone
    pub fn local() -> Self {
        Self::new(TimeMode::Local)
    }

    /// Clock using UTC
    pub fn utc() -> Self {
        Self::new(TimeMode::Utc)
    }

    /// Current wall-clock time in whole seconds since the epoch
    pub fn now(&self) -> i64 {
        Utc::now().timestamp()
    }

    /// Render `timestamp` with a strftime-style format string
    ///
    /// A bad format string (e.g. a stray `%` in a target's `link_fmt`) is
    /// reported as a configuration error instead of panicking inside
    /// chrono's `Display` impl.
    pub fn format(&self, timestamp: i64, fmt: &str) -> BackupResult<String> {
        match self.mode {
            TimeMode::Local => render(
                Local
                    .timestamp_opt(timestamp, 0)
                    .single()
                    .ok_or(BackupError::Time(timestamp))?
                    .format(fmt),
                fmt,
            ),
            TimeMode::Utc => render(
                Utc.timestamp_opt(timestamp, 0)
                    .single()
                    .ok_or(BackupError::Time(timestamp))?
                    .format(fmt),
                fmt,
            ),
        }
    }

    /// The bucket label of `timestamp` at the given granularity
    ///
    /// Two timestamps belong to the same bucket exactly when their labels
    /// are equal.
    pub fn bucket_label(&self, granularity: Granularity, timestamp: i64) -> BackupResult<String> {
        self.format(timestamp, granularity.label_format())
    }

    /// Human-readable `YYYY-mm-dd HH:MM` rendering used in log messages
    pub fn display(&self, timestamp: i64) -> BackupResult<String> {
        self.format(timestamp, "%Y-%m-%d %H:%M")
    }
}

fn render(delayed: impl std::fmt::Display, fmt: &str) -> BackupResult<String> {
    let mut out = String::new();
    write!(out, "{}", delayed)
        .map_err(|_| BackupError::Config(format!("invalid time format: {}", fmt)))?;
    Ok(out)
}
