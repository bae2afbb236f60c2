use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use surge_core::{SeriesSnapshot, SeriesValue};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(
        &self,
        _scenario_path: &Path,
        _config: &surge_core::ScenarioConfig,
        _scenario: &surge_core::RequestScenario,
    ) {
    }

    fn progress(&self) -> Option<surge_core::ProgressFn> {
        Some(Arc::new(move |u: surge_core::ProgressUpdate| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, result: &surge_core::RunResult) -> anyhow::Result<()> {
        let line = build_summary_line(result);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub tick: u64,
    pub elapsed_secs: f64,
    pub interval_secs: f64,
    pub vus: i64,

    pub requests_per_sec: f64,
    pub requests_per_sec_avg: f64,

    pub total_requests: u64,
    pub failed_requests_total: u64,
    pub iterations_total: u64,
    pub checks_failed_total: u64,

    pub latency_p50_ms: Option<f64>,
    pub latency_p95_ms: Option<f64>,

    pub thresholds: Vec<JsonThreshold>,
}

fn build_progress_line(u: &surge_core::ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        tick: u.tick,
        elapsed_secs: u.elapsed.as_secs_f64(),
        interval_secs: u.interval.as_secs_f64(),
        vus: u.metrics.vus_active,

        requests_per_sec: u.metrics.rps_now,
        requests_per_sec_avg: u.metrics.rps_avg,

        total_requests: u.metrics.requests_total,
        failed_requests_total: u.metrics.failed_requests_total,
        iterations_total: u.metrics.iterations_total,
        checks_failed_total: u.metrics.checks_failed_total,

        latency_p50_ms: u.metrics.latency_p50_ms,
        latency_p95_ms: u.metrics.latency_p95_ms,

        thresholds: u.thresholds.iter().map(JsonThreshold::from).collect(),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub run_id: u64,
    pub run_name: String,
    pub run_params: Option<String>,
    pub elapsed_secs: f64,
    pub passed: bool,
    pub aborted: bool,
    pub vus: u64,
    pub iterations: u64,
    pub abandoned_vus: u64,
    pub series: Vec<JsonSeries>,
    pub thresholds: Vec<JsonThreshold>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSeries {
    pub name: String,
    pub kind: String,
    pub tags: BTreeMap<String, String>,
    pub value: JsonSeriesValue,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum JsonSeriesValue {
    Counter {
        count: u64,
        rate: f64,
    },
    Rate {
        hits: u64,
        total: u64,
        rate: Option<f64>,
    },
    Trend {
        count: u64,
        avg: Option<f64>,
        min: Option<f64>,
        med: Option<f64>,
        max: Option<f64>,
        p90: Option<f64>,
        p95: Option<f64>,
        p99: Option<f64>,
    },
    Gauge {
        value: i64,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonThreshold {
    pub selector: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub verdict: String,
}

impl From<&surge_core::ThresholdOutcome> for JsonThreshold {
    fn from(t: &surge_core::ThresholdOutcome) -> Self {
        Self {
            selector: t.selector.clone(),
            expression: t.expression.clone(),
            observed: t.observed,
            verdict: t.verdict.to_string(),
        }
    }
}

fn build_series(s: &SeriesSnapshot, elapsed_secs: f64) -> JsonSeries {
    let value = match &s.value {
        SeriesValue::Counter(count) => JsonSeriesValue::Counter {
            count: *count,
            rate: if elapsed_secs > 0.0 {
                (*count as f64) / elapsed_secs
            } else {
                0.0
            },
        },
        SeriesValue::Rate { hits, total } => JsonSeriesValue::Rate {
            hits: *hits,
            total: *total,
            rate: (*total > 0).then(|| (*hits as f64) / (*total as f64)),
        },
        SeriesValue::Trend(t) => JsonSeriesValue::Trend {
            count: t.count(),
            avg: t.avg(),
            min: t.min(),
            med: t.percentile(50.0),
            max: t.max(),
            p90: t.percentile(90.0),
            p95: t.percentile(95.0),
            p99: t.percentile(99.0),
        },
        SeriesValue::Gauge(v) => JsonSeriesValue::Gauge { value: *v },
    };

    JsonSeries {
        name: s.name.to_string(),
        kind: s.kind.to_string(),
        tags: s
            .tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        value,
    }
}

fn build_summary_line(result: &surge_core::RunResult) -> JsonSummaryLine {
    let elapsed_secs = result.elapsed.as_secs_f64();

    JsonSummaryLine {
        kind: "summary",
        run_id: result.identity.id,
        run_name: result.identity.name.clone(),
        run_params: result.identity.params.clone(),
        elapsed_secs,
        passed: result.passed(),
        aborted: result.aborted(),
        vus: result.scheduler.vus,
        iterations: result.scheduler.iterations,
        abandoned_vus: result.abandoned_vus(),
        series: result
            .snapshot
            .series()
            .iter()
            .map(|s| build_series(s, elapsed_secs))
            .collect(),
        thresholds: result.thresholds.iter().map(JsonThreshold::from).collect(),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
        let _ = out.flush();
    }
}
