use std::sync::Arc;
use std::time::Duration;

use crate::metrics::{MetricKind, TrendSummary};
use crate::query::Query;

#[derive(Debug, Clone)]
pub enum SeriesValue {
    Counter(u64),
    Rate { hits: u64, total: u64 },
    Trend(TrendSummary),
    Gauge(i64),
}

impl SeriesValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Rate { .. } => MetricKind::Rate,
            Self::Trend(_) => MetricKind::Trend,
            Self::Gauge(_) => MetricKind::Gauge,
        }
    }

    /// Number of samples the value was built from (gauges report 1 once written).
    pub fn samples(&self) -> u64 {
        match self {
            Self::Counter(v) => *v,
            Self::Rate { total, .. } => *total,
            Self::Trend(t) => t.count(),
            Self::Gauge(_) => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeriesSnapshot {
    pub name: Arc<str>,
    pub kind: MetricKind,
    /// Sorted by key.
    pub tags: Vec<(Arc<str>, Arc<str>)>,
    pub value: SeriesValue,
}

impl SeriesSnapshot {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .binary_search_by(|(k, _)| k.as_ref().cmp(key))
            .ok()
            .map(|idx| self.tags[idx].1.as_ref())
    }

    /// `name{k:v,k2:v2}`, or just `name` for the untagged series.
    pub fn display_name(&self) -> String {
        if self.tags.is_empty() {
            return self.name.to_string();
        }

        let tags = self
            .tags
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}{{{tags}}}", self.name)
    }
}

/// Point-in-time copy of every series in a [`crate::Registry`].
///
/// `elapsed` is the run time the snapshot covers. Per-second rates are computed against it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    elapsed: Duration,
    series: Vec<SeriesSnapshot>,
}

impl Snapshot {
    pub fn new(elapsed: Duration, mut series: Vec<SeriesSnapshot>) -> Self {
        series.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.tags.cmp(&b.tags)));
        Self { elapsed, series }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn series(&self) -> &[SeriesSnapshot] {
        &self.series
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Kind of the first series recorded under `metric`.
    pub fn kind_of(&self, metric: &str) -> Option<MetricKind> {
        self.series
            .iter()
            .find(|s| s.name.as_ref() == metric)
            .map(|s| s.kind)
    }

    pub fn query<'a>(&'a self, metric: &'a str) -> Query<'a> {
        Query::new(self, metric)
    }
}
