use std::sync::Arc;

use surge_http::HttpClient;
use surge_metrics::{MetricId, MetricKind, Registry};
use tokio_util::sync::CancellationToken;

use crate::checks::CheckMetricIds;
use crate::config::ScenarioConfig;
use crate::http::HttpExecutor;
use crate::iteration_metrics::IterationMetricIds;

pub const VUS: &str = "vus";
pub const VUS_MAX: &str = "vus_max";

/// State shared by every virtual user of one run.
#[derive(Debug)]
pub struct RunContext {
    pub metrics: Arc<Registry>,
    pub http: HttpExecutor,
    pub iteration_metrics: IterationMetricIds,
    pub checks: CheckMetricIds,
    pub vus: MetricId,
    pub vus_max: MetricId,
    /// Fired once when the run should wind down.
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(config: &ScenarioConfig) -> Self {
        let metrics = Arc::new(Registry::default());
        let client = Arc::new(HttpClient::new(Some(config.connect_timeout)));
        let http = HttpExecutor::new(client, metrics.clone(), config.request_timeout);

        Self {
            iteration_metrics: IterationMetricIds::register(&metrics),
            checks: CheckMetricIds::register(&metrics),
            vus: metrics.register(VUS, MetricKind::Gauge),
            vus_max: metrics.register(VUS_MAX, MetricKind::Gauge),
            http,
            metrics,
            cancel: CancellationToken::new(),
        }
    }
}
