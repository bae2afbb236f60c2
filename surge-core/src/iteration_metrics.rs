use std::time::Duration;

use surge_metrics::{MetricId, MetricKind, Registry};

pub const ITERATIONS: &str = "iterations";
pub const ITERATION_DURATION: &str = "iteration_duration";

#[derive(Debug, Clone, Copy)]
pub struct IterationMetricIds {
    pub iterations: MetricId,
    /// Iteration duration in milliseconds.
    pub duration_ms: MetricId,
}

impl IterationMetricIds {
    pub fn register(metrics: &Registry) -> Self {
        Self {
            iterations: metrics.register(ITERATIONS, MetricKind::Counter),
            duration_ms: metrics.register(ITERATION_DURATION, MetricKind::Trend),
        }
    }

    pub fn record_iteration(&self, metrics: &Registry, success: bool, duration: Duration) {
        let status = if success { "success" } else { "failure" };
        let tags = metrics.resolve_tags(&[("status", status)]);

        if let Some(h) = metrics.handle_for(self.iterations, tags.clone()) {
            h.increment();
        }
        if let Some(h) = metrics.handle_for(self.duration_ms, tags) {
            h.record(duration.as_micros() as f64 / 1000.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterations_are_split_by_status() {
        let metrics = Registry::default();
        let ids = IterationMetricIds::register(&metrics);
        ids.record_iteration(&metrics, true, Duration::from_millis(5));
        ids.record_iteration(&metrics, true, Duration::from_millis(7));
        ids.record_iteration(&metrics, false, Duration::from_millis(9));

        let snap = metrics.snapshot(Duration::from_secs(1));
        assert_eq!(snap.query(ITERATIONS).sum_counter(), Some(3));
        assert_eq!(
            snap.query(ITERATIONS)
                .where_eq("status", "failure")
                .sum_counter(),
            Some(1)
        );

        let ok = snap
            .query(ITERATION_DURATION)
            .where_eq("status", "success")
            .merge_trend()
            .unwrap_or_else(|| panic!("expected durations"));
        assert_eq!(ok.count(), 2);
        assert_eq!(ok.max(), Some(7.0));
    }
}
