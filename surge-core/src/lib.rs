mod checks;
mod config;
mod context;
mod controller;
mod error;
mod http;
mod iteration_metrics;
mod progress;
mod request_metrics;
mod result;
mod scenario;
pub mod scheduler;
mod thresholds;
mod thresholds_eval;
mod vu;

pub use checks::{CHECKS, CheckMetricIds};
pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_GRACE_PERIOD, DEFAULT_REQUEST_TIMEOUT, RunConfig,
    ScenarioConfig, ScenarioOptions, scenario_from_options,
};
pub use context::{RunContext, VUS, VUS_MAX};
pub use controller::RunController;
pub use error::{Error, Result};
pub use http::{HttpExecutor, Outcome, OutcomeKind};
pub use iteration_metrics::{ITERATION_DURATION, ITERATIONS, IterationMetricIds};
pub use progress::{LiveMetrics, ProgressFn, ProgressUpdate};
pub use request_metrics::{
    HTTP_REQ_DURATION, HTTP_REQ_ERRORS, HTTP_REQ_FAILED, HTTP_REQS, RequestMetricIds,
    RequestSample, is_expected_status,
};
pub use result::{RunIdentity, RunResult};
pub use scenario::{Iteration, RequestScenario, Scenario, StatusCheck};
pub use scheduler::SchedulerReport;
pub use thresholds::{
    MetricSelector, ThresholdAgg, ThresholdDecl, ThresholdExpr, ThresholdOp, ThresholdSet,
    parse_selector, parse_threshold_expr,
};
pub use thresholds_eval::{ThresholdOutcome, Verdict, all_passed, evaluate_thresholds};
pub use vu::{VuState, VuStateCell};

pub use surge_http::{HttpTransportErrorKind, Method};
pub use surge_metrics::{MetricKind, SeriesSnapshot, SeriesValue, Snapshot, TrendSummary};
pub use tokio_util::sync::CancellationToken;
