use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ScenarioConfig;
use crate::context::RunContext;
use crate::progress::{LiveMetrics, ProgressFn, ProgressUpdate};
use crate::result::{RunIdentity, RunResult};
use crate::scenario::Scenario;
use crate::scheduler;
use crate::thresholds_eval::{Verdict, evaluate_thresholds};

struct ProgressSink {
    interval: Duration,
    f: ProgressFn,
}

/// Drives one run from start to [`RunResult`].
pub struct RunController {
    config: Arc<ScenarioConfig>,
    ctx: Arc<RunContext>,
    progress: Option<ProgressSink>,
}

impl RunController {
    pub fn new(config: ScenarioConfig) -> Self {
        let ctx = Arc::new(RunContext::new(&config));
        Self {
            config: Arc::new(config),
            ctx,
            progress: None,
        }
    }

    /// Calls `f` every `interval` with live metrics and mid-run threshold verdicts.
    #[must_use]
    pub fn with_progress(mut self, interval: Duration, f: ProgressFn) -> Self {
        if !interval.is_zero() {
            self.progress = Some(ProgressSink { interval, f });
        }
        self
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Cancelling this token stops the run early. The result is then marked aborted.
    pub fn cancel_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    pub async fn run<S: Scenario>(self, scenario: S) -> RunResult {
        let identity = RunIdentity::new(self.config.name.as_deref(), SystemTime::now())
            .with_params(self.config.params.clone());
        debug!(
            run_id = identity.id,
            run_name = %identity.name,
            vus = self.config.vus,
            duration = ?self.config.duration,
            "run starting"
        );

        let started = Instant::now();
        let ticker = self
            .progress
            .map(|sink| spawn_progress(self.ctx.clone(), self.config.clone(), sink, started));

        let report = scheduler::run(&self.config, self.ctx.clone(), Arc::new(scenario)).await;
        let elapsed = started.elapsed();

        if let Some(h) = ticker {
            h.abort();
            let _ = h.await;
        }

        let snapshot = self.ctx.metrics.snapshot(elapsed);
        let thresholds = evaluate_thresholds(&snapshot, &self.config.thresholds);
        debug!(
            run_id = identity.id,
            elapsed = ?elapsed,
            iterations = report.iterations,
            abandoned_vus = report.abandoned_vus,
            "run finished"
        );

        RunResult {
            identity,
            elapsed,
            snapshot,
            thresholds,
            scheduler: report,
        }
    }
}

fn spawn_progress(
    ctx: Arc<RunContext>,
    config: Arc<ScenarioConfig>,
    sink: ProgressSink,
    started: Instant,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sink.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick fires immediately. Skip it so the first update covers a full interval.
        interval.tick().await;

        let mut tick: u64 = 0;
        let mut last_at = Instant::now();
        let mut prev_requests: u64 = 0;
        let mut warned: HashSet<(String, String)> = HashSet::new();

        loop {
            interval.tick().await;

            tick = tick.saturating_add(1);
            let now = Instant::now();
            let dt = now.duration_since(last_at);
            last_at = now;

            let snapshot = ctx.metrics.snapshot(started.elapsed());
            let metrics = LiveMetrics::from_snapshot(&snapshot, prev_requests, dt);
            prev_requests = metrics.requests_total;

            let thresholds = evaluate_thresholds(&snapshot, &config.thresholds);
            for t in thresholds.iter().filter(|t| t.verdict == Verdict::Fail) {
                if warned.insert((t.selector.clone(), t.expression.clone())) {
                    warn!(
                        selector = %t.selector,
                        expression = %t.expression,
                        observed = ?t.observed,
                        "threshold failing mid-run"
                    );
                }
            }

            (sink.f)(ProgressUpdate {
                tick,
                interval: dt,
                elapsed: snapshot.elapsed(),
                duration: config.duration,
                metrics,
                thresholds,
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunConfig, ScenarioOptions, scenario_from_options};
    use crate::scenario::Iteration;
    use crate::thresholds::ThresholdDecl;
    use std::sync::Mutex;

    struct Checked;

    impl Scenario for Checked {
        async fn iteration(&self, it: &mut Iteration) {
            it.check("always passes", true);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn config(thresholds: &[(&str, &[&str])], duration: Duration) -> ScenarioConfig {
        scenario_from_options(
            ScenarioOptions {
                name: Some("unit".to_string()),
                vus: Some(2),
                duration: Some(duration),
                thresholds: thresholds
                    .iter()
                    .map(|(sel, exprs)| ThresholdDecl {
                        selector: sel.to_string(),
                        expressions: exprs.iter().map(|e| e.to_string()).collect(),
                    })
                    .collect(),
                ..ScenarioOptions::default()
            },
            RunConfig::default(),
        )
        .unwrap_or_else(|e| panic!("{e}"))
    }

    #[tokio::test]
    async fn run_without_thresholds_passes() {
        let result = RunController::new(config(&[], Duration::from_millis(100)))
            .run(Checked)
            .await;
        assert!(result.passed());
        assert!(!result.aborted());
        assert!(result.thresholds.is_empty());
        assert!(result.identity.name.starts_with("unit "));
        assert!(result.elapsed >= Duration::from_millis(100));
        assert_eq!(result.snapshot.elapsed(), result.elapsed);
    }

    #[tokio::test]
    async fn check_thresholds_are_evaluated_at_the_end() {
        let result = RunController::new(config(
            &[
                ("checks", &["rate==1"]),
                ("checks{check:always passes}", &["count>0"]),
                ("iterations{status:failure}", &["count>0"]),
            ],
            Duration::from_millis(100),
        ))
        .run(Checked)
        .await;

        assert_eq!(result.thresholds.len(), 3);
        assert!(result.thresholds[0].passed());
        assert!(result.thresholds[1].passed());
        // No failed iteration was ever recorded.
        assert_eq!(result.thresholds[2].verdict, Verdict::Indeterminate);
        assert!(!result.passed());
        assert_eq!(result.failed_thresholds().count(), 1);
    }

    #[tokio::test]
    async fn progress_ticks_during_the_run() {
        let ticks: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = ticks.clone();

        let result = RunController::new(config(&[], Duration::from_millis(250)))
            .with_progress(
                Duration::from_millis(50),
                Arc::new(move |u: ProgressUpdate| {
                    if let Ok(mut t) = sink.lock() {
                        t.push(u.tick);
                    }
                }),
            )
            .run(Checked)
            .await;
        assert!(result.passed());

        let seen = ticks
            .lock()
            .unwrap_or_else(|e| panic!("poisoned: {e}"))
            .clone();
        assert!(seen.len() >= 2, "expected several ticks, got {seen:?}");
        assert_eq!(seen[0], 1);
        assert!(seen.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[tokio::test]
    async fn cancel_token_aborts_the_run() {
        let controller = RunController::new(config(&[], Duration::from_secs(60)));
        let cancel = controller.cancel_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let result = controller.run(Checked).await;
        assert!(result.aborted());
        assert!(result.elapsed < Duration::from_secs(10));
    }
}
