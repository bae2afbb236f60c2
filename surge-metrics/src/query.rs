use smallvec::SmallVec;

use crate::metrics::{MetricKind, TrendSummary};
use crate::snapshot::{SeriesSnapshot, SeriesValue, Snapshot};

#[derive(Debug, Clone, Copy)]
enum TagFilter<'a> {
    Eq(&'a str, &'a str),
    NotEq(&'a str, &'a str),
    Has(&'a str),
    Missing(&'a str),
}

impl TagFilter<'_> {
    fn matches(&self, series: &SeriesSnapshot) -> bool {
        match *self {
            TagFilter::Eq(k, v) => series.tag(k) == Some(v),
            TagFilter::NotEq(k, v) => series.tag(k) != Some(v),
            TagFilter::Has(k) => series.tag(k).is_some(),
            TagFilter::Missing(k) => series.tag(k).is_none(),
        }
    }
}

/// Selects the series of one metric whose tags pass every filter and merges them.
///
/// Merging functions return `None` when no series matched.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    snapshot: &'a Snapshot,
    metric: &'a str,
    filters: SmallVec<[TagFilter<'a>; 4]>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(snapshot: &'a Snapshot, metric: &'a str) -> Self {
        Self {
            snapshot,
            metric,
            filters: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn where_eq(mut self, key: &'a str, value: &'a str) -> Self {
        self.filters.push(TagFilter::Eq(key, value));
        self
    }

    #[must_use]
    pub fn where_not_eq(mut self, key: &'a str, value: &'a str) -> Self {
        self.filters.push(TagFilter::NotEq(key, value));
        self
    }

    #[must_use]
    pub fn where_has(mut self, key: &'a str) -> Self {
        self.filters.push(TagFilter::Has(key));
        self
    }

    #[must_use]
    pub fn where_missing(mut self, key: &'a str) -> Self {
        self.filters.push(TagFilter::Missing(key));
        self
    }

    pub fn series(&self) -> impl Iterator<Item = &'a SeriesSnapshot> + '_ {
        let metric = self.metric;
        self.snapshot
            .series()
            .iter()
            .filter(move |s| s.name.as_ref() == metric)
            .filter(|s| self.filters.iter().all(|f| f.matches(s)))
    }

    pub fn sum_counter(&self) -> Option<u64> {
        let mut out: Option<u64> = None;
        for s in self.series() {
            if let SeriesValue::Counter(v) = s.value {
                out = Some(out.unwrap_or(0).saturating_add(v));
            }
        }
        out
    }

    /// `(hits, total)` across matching rate series.
    pub fn sum_rate(&self) -> Option<(u64, u64)> {
        let mut out: Option<(u64, u64)> = None;
        for s in self.series() {
            if let SeriesValue::Rate { hits, total } = s.value {
                let (h, t) = out.unwrap_or((0, 0));
                out = Some((h.saturating_add(hits), t.saturating_add(total)));
            }
        }
        out
    }

    pub fn merge_trend(&self) -> Option<TrendSummary> {
        let mut out: Option<TrendSummary> = None;
        for s in self.series() {
            if let SeriesValue::Trend(t) = &s.value {
                out.get_or_insert_with(TrendSummary::default).merge(t);
            }
        }
        out
    }

    pub fn gauge(&self) -> Option<i64> {
        let mut out: Option<i64> = None;
        for s in self.series() {
            if let SeriesValue::Gauge(v) = s.value {
                out = Some(out.unwrap_or(0).saturating_add(v));
            }
        }
        out
    }

    /// Merges matching series into a single value of the metric's kind.
    pub fn aggregate(&self) -> Option<SeriesValue> {
        match self.snapshot.kind_of(self.metric)? {
            MetricKind::Counter => self.sum_counter().map(SeriesValue::Counter),
            MetricKind::Rate => self
                .sum_rate()
                .map(|(hits, total)| SeriesValue::Rate { hits, total }),
            MetricKind::Trend => self.merge_trend().map(SeriesValue::Trend),
            MetricKind::Gauge => self.gauge().map(SeriesValue::Gauge),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Registry, Sample};
    use std::time::Duration;

    #[test]
    fn sum_counter_filters_on_tags() {
        let reg = Registry::default();
        for _ in 0..3 {
            reg.record(Sample::counter(
                "http_reqs",
                &[("expected_response", "true"), ("status", "200")],
                1.0,
            ));
        }
        reg.record(Sample::counter(
            "http_reqs",
            &[("expected_response", "false"), ("status", "500")],
            1.0,
        ));

        let snap = reg.snapshot(Duration::from_secs(1));
        assert_eq!(snap.query("http_reqs").sum_counter(), Some(4));
        assert_eq!(
            snap.query("http_reqs")
                .where_eq("expected_response", "true")
                .sum_counter(),
            Some(3)
        );
        assert_eq!(
            snap.query("http_reqs")
                .where_not_eq("status", "200")
                .sum_counter(),
            Some(1)
        );
        assert_eq!(
            snap.query("http_reqs")
                .where_eq("expected_response", "maybe")
                .sum_counter(),
            None
        );
    }

    #[test]
    fn merge_trend_respects_missing_tag_filter() {
        let reg = Registry::default();
        reg.record(Sample::trend("iteration_duration", &[], 10.0));
        reg.record(Sample::trend("iteration_duration", &[], 20.0));
        reg.record(Sample::trend(
            "iteration_duration",
            &[("status", "failure")],
            999.0,
        ));

        let snap = reg.snapshot(Duration::from_secs(1));
        let t = snap
            .query("iteration_duration")
            .where_missing("status")
            .merge_trend()
            .unwrap_or_else(|| panic!("expected trend"));
        assert_eq!(t.count(), 2);
        assert_eq!(t.max(), Some(20.0));

        let all = snap
            .query("iteration_duration")
            .where_has("status")
            .merge_trend()
            .unwrap_or_else(|| panic!("expected trend"));
        assert_eq!(all.count(), 1);
    }

    #[test]
    fn aggregate_uses_metric_kind() {
        let reg = Registry::default();
        reg.record(Sample::rate("checks", &[("check", "a")], true));
        reg.record(Sample::rate("checks", &[("check", "b")], false));

        let snap = reg.snapshot(Duration::from_secs(1));
        match snap.query("checks").aggregate() {
            Some(crate::SeriesValue::Rate { hits, total }) => {
                assert_eq!(hits, 1);
                assert_eq!(total, 2);
            }
            other => panic!("unexpected aggregate: {other:?}"),
        }
        assert!(snap.query("missing").aggregate().is_none());
    }
}
