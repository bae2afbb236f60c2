use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    /// Monotonic sum.
    Counter,
    /// Share of non-zero samples (`hits / total`).
    Rate,
    /// Distribution of values (latencies, durations).
    Trend,
    /// Last written value.
    Gauge,
}

/// One observation handed to [`crate::Registry::record`].
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub metric: &'a str,
    pub kind: MetricKind,
    pub tags: &'a [(&'a str, &'a str)],
    pub value: f64,
}

impl<'a> Sample<'a> {
    pub fn counter(metric: &'a str, tags: &'a [(&'a str, &'a str)], value: f64) -> Self {
        Self {
            metric,
            kind: MetricKind::Counter,
            tags,
            value,
        }
    }

    pub fn rate(metric: &'a str, tags: &'a [(&'a str, &'a str)], hit: bool) -> Self {
        Self {
            metric,
            kind: MetricKind::Rate,
            tags,
            value: if hit { 1.0 } else { 0.0 },
        }
    }

    pub fn trend(metric: &'a str, tags: &'a [(&'a str, &'a str)], value: f64) -> Self {
        Self {
            metric,
            kind: MetricKind::Trend,
            tags,
            value,
        }
    }

    pub fn gauge(metric: &'a str, tags: &'a [(&'a str, &'a str)], value: f64) -> Self {
        Self {
            metric,
            kind: MetricKind::Gauge,
            tags,
            value,
        }
    }
}

/// Trend values are stored in the histogram in thousandths of the recorded unit.
const TREND_SCALE: f64 = 1000.0;

fn new_trend_histogram() -> Histogram<u64> {
    // Auto-resizing, so large outliers are never rejected.
    match Histogram::<u64>::new(3) {
        Ok(h) => h,
        Err(err) => panic!("failed to create histogram: {err}"),
    }
}

#[derive(Debug, Clone)]
pub struct TrendSummary {
    hist: Histogram<u64>,
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for TrendSummary {
    fn default() -> Self {
        Self {
            hist: new_trend_histogram(),
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl TrendSummary {
    fn record(&mut self, value: f64) {
        let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
        let scaled = (value * TREND_SCALE).round() as u64;
        let _ = self.hist.record(scaled);

        self.count = self.count.saturating_add(1);
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn merge(&mut self, other: &TrendSummary) {
        if other.count == 0 {
            return;
        }
        let _ = self.hist.add(&other.hist);
        self.count = self.count.saturating_add(other.count);
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    /// Percentile in `0.0..=100.0`.
    pub fn percentile(&self, pct: f64) -> Option<f64> {
        if self.count == 0 || !(0.0..=100.0).contains(&pct) {
            return None;
        }
        let scaled = self.hist.value_at_quantile(pct / 100.0);
        Some(scaled as f64 / TREND_SCALE)
    }
}

#[derive(Debug, Default)]
pub struct RateCounts {
    hits: AtomicU64,
    total: AtomicU64,
}

/// Write handle for one series. Cloning shares the underlying storage.
#[derive(Debug, Clone)]
pub enum MetricHandle {
    Counter(Arc<AtomicU64>),
    Rate(Arc<RateCounts>),
    Trend(Arc<Mutex<TrendSummary>>),
    Gauge(Arc<AtomicI64>),
}

impl MetricHandle {
    pub(crate) fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => Self::Counter(Arc::new(AtomicU64::new(0))),
            MetricKind::Rate => Self::Rate(Arc::new(RateCounts::default())),
            MetricKind::Trend => Self::Trend(Arc::new(Mutex::new(TrendSummary::default()))),
            MetricKind::Gauge => Self::Gauge(Arc::new(AtomicI64::new(0))),
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Rate(_) => MetricKind::Rate,
            Self::Trend(_) => MetricKind::Trend,
            Self::Gauge(_) => MetricKind::Gauge,
        }
    }

    /// Applies one sample according to the series kind.
    #[inline]
    pub fn record(&self, value: f64) {
        match self {
            Self::Counter(c) => {
                let v = if value.is_finite() { value.max(0.0) } else { 0.0 };
                c.fetch_add(v.round() as u64, Ordering::Relaxed);
            }
            Self::Rate(r) => {
                if value.is_finite() && value != 0.0 {
                    r.hits.fetch_add(1, Ordering::Relaxed);
                }
                r.total.fetch_add(1, Ordering::Relaxed);
            }
            Self::Trend(t) => t.lock().record(value),
            Self::Gauge(g) => {
                let v = if value.is_finite() { value.round() as i64 } else { 0 };
                g.store(v, Ordering::Relaxed);
            }
        }
    }

    #[inline]
    pub fn increment(&self) {
        match self {
            Self::Gauge(g) => {
                g.fetch_add(1, Ordering::Relaxed);
            }
            _ => self.record(1.0),
        }
    }

    #[inline]
    pub fn decrement_gauge(&self) {
        if let Self::Gauge(g) = self {
            g.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Raises a gauge to `value` if it is currently lower.
    pub fn raise_gauge(&self, value: i64) {
        if let Self::Gauge(g) = self {
            g.fetch_max(value, Ordering::Relaxed);
        }
    }

    pub fn gauge_value(&self) -> i64 {
        match self {
            Self::Gauge(g) => g.load(Ordering::Relaxed),
            _ => 0,
        }
    }

    pub(crate) fn load(&self) -> crate::SeriesValue {
        use crate::SeriesValue;

        match self {
            Self::Counter(c) => SeriesValue::Counter(c.load(Ordering::Relaxed)),
            Self::Rate(r) => {
                // A torn read may observe a hit before its total.
                let total = r.total.load(Ordering::Relaxed);
                let hits = r.hits.load(Ordering::Relaxed).min(total);
                SeriesValue::Rate { hits, total }
            }
            Self::Trend(t) => SeriesValue::Trend(t.lock().clone()),
            Self::Gauge(g) => SeriesValue::Gauge(g.load(Ordering::Relaxed)),
        }
    }
}
