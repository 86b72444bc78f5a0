//! Generational retention
//!
//! The pure keep/remove classification: given a retention policy and the
//! current snapshot set, decide which snapshots each time bucket retains
//! and which snapshots nothing retains.
//!
//! Snapshots are grouped per granularity by their bucket label, walking
//! most-recent-first. Each hour-group is represented by its newest member
//! (the latest refresh within the hour); every coarser group is represented
//! by its oldest member (the snapshot that anchors the start of that day,
//! week, month or year). The first N groups survive, N being the bucket's
//! retention count.

use std::collections::HashSet;

use crate::clock::{Clock, Granularity};
use crate::error::BackupResult;
use crate::models::{RetentionPolicy, Snapshot};

/// Which member of a bucket group represents the group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pick {
    Newest,
    Oldest,
}

impl Granularity {
    fn pick(self) -> Pick {
        match self {
            Granularity::Hourly => Pick::Newest,
            _ => Pick::Oldest,
        }
    }
}

/// The snapshots each of the five buckets retains, most recent first
#[derive(Debug, Clone, Default)]
pub struct KeepBuckets {
    pub hourly: Vec<Snapshot>,
    pub daily: Vec<Snapshot>,
    pub weekly: Vec<Snapshot>,
    pub monthly: Vec<Snapshot>,
    pub yearly: Vec<Snapshot>,
}

impl KeepBuckets {
    /// The kept snapshots of one bucket
    pub fn bucket(&self, granularity: Granularity) -> &[Snapshot] {
        match granularity {
            Granularity::Hourly => &self.hourly,
            Granularity::Daily => &self.daily,
            Granularity::Weekly => &self.weekly,
            Granularity::Monthly => &self.monthly,
            Granularity::Yearly => &self.yearly,
        }
    }

    /// Whether `snapshot` is retained by the given bucket
    pub fn retains(&self, granularity: Granularity, snapshot: &Snapshot) -> bool {
        self.bucket(granularity).contains(snapshot)
    }

    /// Union of all five buckets
    fn union(&self) -> HashSet<&Snapshot> {
        Granularity::ALL
            .iter()
            .flat_map(|&g| self.bucket(g).iter())
            .collect()
    }
}

/// The outcome of classifying a snapshot set against a policy
#[derive(Debug, Clone)]
pub struct RotationPlan {
    /// Per-bucket keep lists; one snapshot may appear in several
    pub keep: KeepBuckets,
    /// Snapshots no bucket retains, most recent first
    pub remove: Vec<Snapshot>,
}

/// Classify `snapshots` into keep-buckets and a removal set
///
/// Invariant: every input snapshot is either kept by at least one bucket
/// or listed in `remove`, never both.
pub fn rotate(
    policy: &RetentionPolicy,
    clock: Clock,
    snapshots: &[Snapshot],
) -> BackupResult<RotationPlan> {
    let mut sorted = snapshots.to_vec();
    sorted.sort_by(|a, b| b.cmp(a));

    let keep = KeepBuckets {
        hourly: bucket_reps(&sorted, clock, Granularity::Hourly, policy.hourly)?,
        daily: bucket_reps(&sorted, clock, Granularity::Daily, policy.daily)?,
        weekly: bucket_reps(&sorted, clock, Granularity::Weekly, policy.weekly)?,
        monthly: bucket_reps(&sorted, clock, Granularity::Monthly, policy.monthly)?,
        yearly: bucket_reps(&sorted, clock, Granularity::Yearly, policy.yearly)?,
    };

    let kept = keep.union();
    let remove = sorted
        .iter()
        .filter(|s| !kept.contains(s))
        .cloned()
        .collect();

    Ok(RotationPlan { keep, remove })
}

/// The representatives of the first `count` bucket groups
///
/// `sorted` must be in descending timestamp order; groups are runs of equal
/// bucket labels within it.
fn bucket_reps(
    sorted: &[Snapshot],
    clock: Clock,
    granularity: Granularity,
    count: u32,
) -> BackupResult<Vec<Snapshot>> {
    let count = count as usize;
    if count == 0 {
        return Ok(Vec::new());
    }
    let pick = granularity.pick();
    let mut reps: Vec<Snapshot> = Vec::new();
    let mut current: Option<String> = None;
    for snapshot in sorted {
        let label = clock.bucket_label(granularity, snapshot.timestamp)?;
        if current.as_deref() == Some(label.as_str()) {
            if pick == Pick::Oldest {
                if let Some(rep) = reps.last_mut() {
                    // Walking descending, each later member is older.
                    *rep = snapshot.clone();
                }
            }
        } else {
            if reps.len() == count {
                break;
            }
            current = Some(label);
            reps.push(snapshot.clone());
        }
    }
    Ok(reps)
}
