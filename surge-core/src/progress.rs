use std::sync::Arc;
use std::time::Duration;

use surge_metrics::Snapshot;

use crate::checks::CHECKS;
use crate::context::VUS;
use crate::iteration_metrics::ITERATIONS;
use crate::request_metrics::{HTTP_REQ_DURATION, HTTP_REQ_FAILED, HTTP_REQS};
use crate::thresholds_eval::ThresholdOutcome;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveMetrics {
    pub vus_active: i64,
    pub requests_total: u64,
    pub failed_requests_total: u64,
    /// Requests/sec over the last progress interval.
    pub rps_now: f64,
    /// Requests/sec over the whole run so far.
    pub rps_avg: f64,
    pub iterations_total: u64,
    pub checks_failed_total: u64,
    /// Latency percentiles (milliseconds) over the whole run so far.
    pub latency_p50_ms: Option<f64>,
    pub latency_p95_ms: Option<f64>,
}

impl LiveMetrics {
    /// `prev_requests` is the request total of the previous tick, `interval` the time since.
    pub fn from_snapshot(snapshot: &Snapshot, prev_requests: u64, interval: Duration) -> Self {
        let requests_total = snapshot.query(HTTP_REQS).sum_counter().unwrap_or(0);
        let (failed_requests_total, _) = snapshot.query(HTTP_REQ_FAILED).sum_rate().unwrap_or((0, 0));
        let (checks_passed, checks_total) = snapshot.query(CHECKS).sum_rate().unwrap_or((0, 0));
        let latency = snapshot.query(HTTP_REQ_DURATION).merge_trend();

        let per_sec = |count: u64, over: Duration| {
            let secs = over.as_secs_f64();
            if secs > 0.0 { count as f64 / secs } else { 0.0 }
        };

        Self {
            vus_active: snapshot.query(VUS).gauge().unwrap_or(0),
            requests_total,
            failed_requests_total,
            rps_now: per_sec(requests_total.saturating_sub(prev_requests), interval),
            rps_avg: per_sec(requests_total, snapshot.elapsed()),
            iterations_total: snapshot.query(ITERATIONS).sum_counter().unwrap_or(0),
            checks_failed_total: checks_total.saturating_sub(checks_passed),
            latency_p50_ms: latency.as_ref().and_then(|t| t.percentile(50.0)),
            latency_p95_ms: latency.as_ref().and_then(|t| t.percentile(95.0)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based).
    pub tick: u64,
    pub interval: Duration,
    pub elapsed: Duration,
    /// Configured run duration.
    pub duration: Duration,
    pub metrics: LiveMetrics,
    /// Thresholds evaluated against the metrics collected so far.
    pub thresholds: Vec<ThresholdOutcome>,
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;

#[cfg(test)]
mod tests {
    use super::*;
    use surge_metrics::{Registry, Sample};

    #[test]
    fn live_metrics_from_snapshot() {
        let reg = Registry::default();
        for i in 0..30 {
            let expected = if i < 20 { "true" } else { "false" };
            reg.record(Sample::counter(
                HTTP_REQS,
                &[("expected_response", expected)],
                1.0,
            ));
            reg.record(Sample::rate(HTTP_REQ_FAILED, &[], i >= 20));
        }
        reg.record(Sample::rate(CHECKS, &[("check", "a")], false));
        reg.record(Sample::rate(CHECKS, &[("check", "a")], true));
        reg.record(Sample::gauge(VUS, &[], 2.0));

        let snap = reg.snapshot(Duration::from_secs(3));
        let live = LiveMetrics::from_snapshot(&snap, 10, Duration::from_secs(2));

        assert_eq!(live.requests_total, 30);
        assert_eq!(live.failed_requests_total, 10);
        assert_eq!(live.rps_now, 10.0);
        assert_eq!(live.rps_avg, 10.0);
        assert_eq!(live.checks_failed_total, 1);
        assert_eq!(live.vus_active, 2);
        assert!(live.latency_p95_ms.is_none());
    }

    #[test]
    fn empty_snapshot_has_zero_rates() {
        let snap = Registry::default().snapshot(Duration::ZERO);
        let live = LiveMetrics::from_snapshot(&snap, 0, Duration::ZERO);
        assert_eq!(live, LiveMetrics::default());
    }
}
