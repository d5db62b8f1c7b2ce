//! Schedule evaluation against host progress
//!
//! Schedules match by exact equality. A command scheduled for a counter value
//! the host steps over never runs.

use serde::{Deserialize, Serialize};

use super::host::Host;
use super::record::{CommandRecord, Schedule, ScheduleKey};

/// Snapshot of the host's progress counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Completed epochs
    pub epoch: u64,
    /// Completed iterations
    pub iteration: u64,
}

impl Progress {
    /// Create a progress snapshot
    pub fn new(epoch: u64, iteration: u64) -> Self {
        Self { epoch, iteration }
    }

    /// Read the counters from a host
    pub fn of(host: &dyn Host) -> Self {
        Self {
            epoch: host.epoch(),
            iteration: host.iteration(),
        }
    }
}

/// Decide whether a command should run now.
///
/// Answered commands never run again; unscheduled commands run immediately.
pub fn should_execute(record: &CommandRecord, progress: Progress) -> bool {
    if record.is_answered() {
        return false;
    }

    match &record.request().schedule {
        None => true,
        Some(schedule) => schedule_matches(schedule, progress),
    }
}

/// Whether a schedule is satisfied at the given progress.
///
/// Unrecognized keys never match, nor do values that are not non-negative
/// integral numbers (`3.0` counts as `3`).
pub fn schedule_matches(schedule: &Schedule, progress: Progress) -> bool {
    let current = match schedule.key {
        ScheduleKey::Epoch => progress.epoch,
        ScheduleKey::Iteration => progress.iteration,
        ScheduleKey::Other(_) => return false,
    };

    schedule.target() == Some(current)
}
