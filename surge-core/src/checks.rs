use surge_metrics::{MetricId, MetricKind, Registry};

pub const CHECKS: &str = "checks";

/// Pass/fail assertions, recorded as a rate tagged with the check name.
#[derive(Debug, Clone, Copy)]
pub struct CheckMetricIds {
    pub checks: MetricId,
}

impl CheckMetricIds {
    pub fn register(metrics: &Registry) -> Self {
        Self {
            checks: metrics.register(CHECKS, MetricKind::Rate),
        }
    }

    pub fn record_check(&self, metrics: &Registry, name: &str, passed: bool) {
        if let Some(h) = metrics.handle(self.checks, &[("check", name)]) {
            h.record(if passed { 1.0 } else { 0.0 });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn checks_are_tagged_by_name() {
        let metrics = Registry::default();
        let ids = CheckMetricIds::register(&metrics);
        ids.record_check(&metrics, "status is 200", true);
        ids.record_check(&metrics, "status is 200", false);
        ids.record_check(&metrics, "body not empty", true);

        let snap = metrics.snapshot(Duration::from_secs(1));
        assert_eq!(
            snap.query(CHECKS)
                .where_eq("check", "status is 200")
                .sum_rate(),
            Some((1, 2))
        );
        assert_eq!(snap.query(CHECKS).sum_rate(), Some((2, 3)));
    }
}
