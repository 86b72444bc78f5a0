//! Run options
//!
//! Process-wide flags set once at startup and threaded read-only through
//! every action.

use crate::clock::Clock;

/// Flags governing one invocation of the tool
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Print what would be done but transfer nothing and rotate nothing
    pub dry_run: bool,
    /// Make a new snapshot even when the current interval already has one
    pub force: bool,
    /// Chain a rotate after every successful sync
    pub rotate_after_sync: bool,
    /// Local or UTC calendar for all bucketing and formatting
    pub clock: Clock,
}
