use std::fmt::Write as _;

use surge_core::{RunResult, SeriesSnapshot, SeriesValue, ThresholdOutcome, Verdict};

use super::format::*;

pub(crate) fn render(result: &RunResult) -> String {
    let mut out = String::new();
    let snapshot = &result.snapshot;
    let elapsed = result.elapsed;

    writeln!(&mut out, "summary: {}", result.identity.name).ok();
    if let Some(params) = &result.identity.params {
        writeln!(&mut out, "  params: {params}").ok();
    }
    writeln!(
        &mut out,
        "  elapsed: {} iterations: {} vus: {}",
        format_duration(elapsed),
        result.scheduler.iterations,
        result.scheduler.vus
    )
    .ok();
    if result.aborted() {
        out.push_str("  run aborted before the configured duration\n");
    }
    if result.abandoned_vus() > 0 {
        writeln!(
            &mut out,
            "  abandoned_vus: {} (still busy after the grace period)",
            result.abandoned_vus()
        )
        .ok();
    }
    out.push('\n');

    if snapshot.is_empty() {
        out.push_str("metrics: none recorded\n");
    } else {
        out.push_str("metrics\n");
        let secs = elapsed.as_secs_f64();
        for s in snapshot.series() {
            render_series(s, secs, &mut out);
        }
    }

    if !result.thresholds.is_empty() {
        out.push('\n');
        out.push_str("thresholds\n");
        for t in &result.thresholds {
            render_threshold(t, &mut out);
        }
    }

    out
}

fn render_series(s: &SeriesSnapshot, elapsed_secs: f64, out: &mut String) {
    let name = s.display_name();
    match &s.value {
        SeriesValue::Counter(count) => {
            let rate = if elapsed_secs > 0.0 {
                (*count as f64) / elapsed_secs
            } else {
                0.0
            };
            writeln!(out, "  {name}: {count} ({}/s)", format_rate(rate)).ok();
        }
        SeriesValue::Rate { hits, total } => {
            writeln!(
                out,
                "  {name}: {} ({hits}/{total})",
                format_percent(*hits, *total)
            )
            .ok();
        }
        SeriesValue::Trend(t) => {
            writeln!(
                out,
                "  {name}: avg={} min={} med={} p90={} p95={} max={} (n={})",
                format_ms_opt(t.avg()),
                format_ms_opt(t.min()),
                format_ms_opt(t.percentile(50.0)),
                format_ms_opt(t.percentile(90.0)),
                format_ms_opt(t.percentile(95.0)),
                format_ms_opt(t.max()),
                t.count()
            )
            .ok();
        }
        SeriesValue::Gauge(v) => {
            writeln!(out, "  {name}: {v}").ok();
        }
    }
}

fn render_threshold(t: &ThresholdOutcome, out: &mut String) {
    let mark = match t.verdict {
        Verdict::Pass => "ok  ",
        Verdict::Fail => "FAIL",
        Verdict::Indeterminate => "FAIL",
    };
    let observed = match (t.verdict, t.observed) {
        (Verdict::Indeterminate, _) | (_, None) => "no data".to_string(),
        (_, Some(v)) => format!("observed {v}"),
    };
    writeln!(
        out,
        "  {mark} {}: {} ({observed})",
        t.selector, t.expression
    )
    .ok();
}
