use std::time::{Duration, SystemTime, UNIX_EPOCH};

use surge_metrics::Snapshot;

use crate::scheduler::SchedulerReport;
use crate::thresholds_eval::{ThresholdOutcome, all_passed};

/// Id and display name of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    /// UNIX time of the start, in nanoseconds.
    pub id: u64,
    /// `<name> <RFC 3339 start time>`, or just the timestamp for unnamed runs.
    pub name: String,
    /// Free-form run parameters, e.g. a build id or environment label.
    pub params: Option<String>,
    pub started_at: SystemTime,
}

impl RunIdentity {
    pub fn new(name: Option<&str>, started_at: SystemTime) -> Self {
        let id = started_at
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        let stamp = humantime::format_rfc3339_nanos(started_at);
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => format!("{n} {stamp}"),
            None => stamp.to_string(),
        };

        Self {
            id,
            name,
            params: None,
            started_at,
        }
    }

    pub fn with_params(mut self, params: Option<String>) -> Self {
        self.params = params.filter(|p| !p.trim().is_empty());
        self
    }
}

/// Everything a run produced. Built once when the run ends.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub identity: RunIdentity,
    pub elapsed: Duration,
    pub snapshot: Snapshot,
    pub thresholds: Vec<ThresholdOutcome>,
    pub scheduler: SchedulerReport,
}

impl RunResult {
    /// True when every threshold passed, or none were declared.
    pub fn passed(&self) -> bool {
        all_passed(&self.thresholds)
    }

    pub fn aborted(&self) -> bool {
        self.scheduler.aborted
    }

    pub fn abandoned_vus(&self) -> u64 {
        self.scheduler.abandoned_vus
    }

    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdOutcome> {
        self.thresholds.iter().filter(|t| !t.passed())
    }
}
