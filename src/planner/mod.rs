//! Effect-sequence planners
//!
//! One planner per action. Each is deterministic given its inputs and the
//! results its runner feeds back; none of them touches the OS directly.
//!
//! - `sync`: probe, stage, transfer, commit
//! - `rotate`: retire snapshots the retention policy no longer keeps
//! - `aliases`: rebuild the human-readable symlinks

pub mod aliases;
pub mod rotate;
pub mod sync;

pub use aliases::refresh_aliases;
pub use rotate::plan_rotate;
pub use sync::{plan_sync, SyncOutcome};
