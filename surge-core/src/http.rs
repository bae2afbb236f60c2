use std::sync::Arc;
use std::time::{Duration, Instant};

use surge_http::{HttpClient, HttpRequest, HttpTransportErrorKind, Method};
use surge_metrics::Registry;

use crate::request_metrics::{RequestMetricIds, RequestSample, is_expected_status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// A response arrived with this status.
    Status(u16),
    /// No response: refused, timed out, DNS failure or an unusable URL.
    Failed(HttpTransportErrorKind),
}

/// Result of one request, handed back to the scenario body for checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub latency: Duration,
}

impl Outcome {
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            OutcomeKind::Status(s) => Some(s),
            OutcomeKind::Failed(_) => None,
        }
    }

    pub fn error_kind(&self) -> Option<HttpTransportErrorKind> {
        match self.kind {
            OutcomeKind::Status(_) => None,
            OutcomeKind::Failed(kind) => Some(kind),
        }
    }

    pub fn is_expected(&self) -> bool {
        self.status().is_some_and(is_expected_status)
    }
}

/// Issues single requests and records each one into the metric store.
///
/// Transport failures never surface as errors. They come back as [`OutcomeKind::Failed`]
/// and are counted under `http_req_failed` and `http_req_errors`.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Arc<HttpClient>,
    metrics: Arc<Registry>,
    ids: RequestMetricIds,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(client: Arc<HttpClient>, metrics: Arc<Registry>, timeout: Duration) -> Self {
        let ids = RequestMetricIds::register(&metrics);
        Self {
            client,
            metrics,
            ids,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn execute(&self, method: Method, url: &str) -> Outcome {
        let method_tag = method.as_str().to_string();
        let req = HttpRequest::new(method, url).with_timeout(self.timeout);

        let started = Instant::now();
        let kind = match self.client.request(req).await {
            Ok(res) => OutcomeKind::Status(res.status),
            Err(err) => {
                tracing::debug!(url, error = %err, "request failed");
                OutcomeKind::Failed(err.transport_error_kind())
            }
        };
        let latency = started.elapsed();

        let error_kind = match kind {
            OutcomeKind::Failed(k) => Some(k.to_string()),
            OutcomeKind::Status(_) => None,
        };
        self.ids.record_request(
            &self.metrics,
            RequestSample {
                method: &method_tag,
                name: url,
                status: match kind {
                    OutcomeKind::Status(s) => Some(s),
                    OutcomeKind::Failed(_) => None,
                },
                latency,
                error_kind: error_kind.as_deref(),
            },
        );

        Outcome { kind, latency }
    }
}
