//! Running counters for a [`ResourceCycler`](crate::ResourceCycler).

use crate::key::ResourceKey;

/// How a drained completion was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Appended to the resident set.
    Admitted,
    /// Key was already resident; the resource went straight back to the backend.
    Duplicate,
    /// Issued before the most recent eviction; released and dropped.
    Stale,
    /// The backend reported a [`LoadError`](crate::LoadError).
    Failed,
}

/// Counters accumulated by a [`ResourceCycler`](crate::ResourceCycler).
///
/// `Display` renders a one-line status summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CyclerStats {
    /// Completed ticks.
    pub ticks: u64,
    /// Evict/admit cycles run.
    pub cycles: u64,
    /// Load requests issued.
    pub requested: u64,
    /// Completions appended to the resident set.
    pub admitted: u64,
    /// Completions discarded because the key was already resident.
    pub duplicates: u64,
    /// Completions discarded because an eviction happened after they were issued.
    pub stale: u64,
    /// Completions that carried a load error.
    pub failed: u64,
    /// Resident resources released by eviction.
    pub evicted: u64,
    /// Resident count after the last tick or drain.
    pub resident: usize,
    /// Key most recently bound to a display slot.
    pub last_bound: Option<ResourceKey>,
}

impl CyclerStats {
    pub(crate) fn record(&mut self, outcome: CompletionOutcome) {
        match outcome {
            CompletionOutcome::Admitted => self.admitted += 1,
            CompletionOutcome::Duplicate => self.duplicates += 1,
            CompletionOutcome::Stale => self.stale += 1,
            CompletionOutcome::Failed => self.failed += 1,
        }
    }

    /// Requests that have not produced any outcome yet.
    pub fn in_flight(&self) -> u64 {
        self.requested
            .saturating_sub(self.admitted + self.duplicates + self.stale + self.failed)
    }
}

impl std::fmt::Display for CyclerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "resident: {} | in flight: {} | cycles: {} | evicted: {} | dup/stale/failed: {}/{}/{} | last bound: ",
            self.resident,
            self.in_flight(),
            self.cycles,
            self.evicted,
            self.duplicates,
            self.stale,
            self.failed,
        )?;
        match self.last_bound {
            Some(key) => write!(f, "{key}"),
            None => write!(f, "none"),
        }
    }
}
