use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

mod format;
mod progress;
mod summary;

use format::{format_duration, format_ms_opt, format_rate};
use progress::HumanProgress;
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
    prev_errors: Arc<AtomicU64>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
            prev_errors: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(
        &self,
        scenario_path: &std::path::Path,
        config: &surge_core::ScenarioConfig,
        scenario: &surge_core::RequestScenario,
    ) {
        println!("scenario: {}", scenario_path.display());
        println!(
            "target: {} {} vus={} duration={} grace_period={}",
            scenario.method(),
            scenario.url(),
            config.vus,
            format_duration(config.duration),
            format_duration(config.grace_period)
        );
        for t in &config.thresholds {
            let exprs = t
                .expressions
                .iter()
                .map(|e| e.source.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            println!("threshold: {} [{exprs}]", t.source);
        }
        println!();
    }

    fn progress(&self) -> Option<surge_core::ProgressFn> {
        let progress = self.progress.clone();
        let prev_errors = self.prev_errors.clone();

        Some(Arc::new(move |u: surge_core::ProgressUpdate| {
            let errors_total = u
                .metrics
                .failed_requests_total
                .saturating_add(u.metrics.checks_failed_total);
            let errors_delta =
                errors_total.saturating_sub(prev_errors.swap(errors_total, Ordering::Relaxed));

            let failing = u.thresholds.iter().filter(|t| !t.passed()).count();

            let message = format!(
                "vus={} elapsed={} rps={} p95={} errors={errors_delta}/{errors_total} thresholds_failing={failing}",
                u.metrics.vus_active,
                format_duration(u.elapsed),
                format_rate(u.metrics.rps_now),
                format_ms_opt(u.metrics.latency_p95_ms),
            );

            progress.update("run", u.duration, u.elapsed, message);
        }))
    }

    fn print_summary(&self, result: &surge_core::RunResult) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(result));

        let failed: Vec<_> = result.failed_thresholds().collect();
        if !failed.is_empty() {
            eprintln!("thresholds failed: {}", failed.len());
        }

        Ok(())
    }
}
