use std::time::Duration;

use surge_metrics::{MetricId, MetricKind, Registry};

pub const HTTP_REQS: &str = "http_reqs";
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
pub const HTTP_REQ_ERRORS: &str = "http_req_errors";

#[derive(Debug, Clone, Copy)]
pub struct RequestMetricIds {
    pub reqs: MetricId,
    /// Request latency in milliseconds.
    pub duration_ms: MetricId,
    pub failed: MetricId,
    pub errors: MetricId,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestSample<'a> {
    pub method: &'a str,
    pub name: &'a str,
    /// `None` when no response was received.
    pub status: Option<u16>,
    pub latency: Duration,
    pub error_kind: Option<&'a str>,
}

/// 2xx and 3xx responses count as expected.
pub fn is_expected_status(status: u16) -> bool {
    (200..400).contains(&status)
}

impl RequestMetricIds {
    pub fn register(metrics: &Registry) -> Self {
        Self {
            reqs: metrics.register(HTTP_REQS, MetricKind::Counter),
            duration_ms: metrics.register(HTTP_REQ_DURATION, MetricKind::Trend),
            failed: metrics.register(HTTP_REQ_FAILED, MetricKind::Rate),
            errors: metrics.register(HTTP_REQ_ERRORS, MetricKind::Counter),
        }
    }

    pub fn record_request(&self, metrics: &Registry, sample: RequestSample<'_>) {
        let expected = sample.status.is_some_and(is_expected_status);
        let status = sample.status.unwrap_or(0).to_string();

        let tags = metrics.resolve_tags(&[
            ("method", sample.method),
            ("name", sample.name),
            ("status", status.as_str()),
            ("expected_response", if expected { "true" } else { "false" }),
        ]);

        if let Some(h) = metrics.handle_for(self.reqs, tags.clone()) {
            h.increment();
        }
        if let Some(h) = metrics.handle_for(self.failed, tags.clone()) {
            h.record(if expected { 0.0 } else { 1.0 });
        }
        if sample.status.is_some()
            && let Some(h) = metrics.handle_for(self.duration_ms, tags)
        {
            h.record(sample.latency.as_micros() as f64 / 1000.0);
        }

        if let Some(kind) = sample.error_kind {
            let tags = metrics.resolve_tags(&[
                ("method", sample.method),
                ("name", sample.name),
                ("error_kind", kind),
            ]);
            if let Some(h) = metrics.handle_for(self.errors, tags) {
                h.increment();
            }
        }
    }
}
