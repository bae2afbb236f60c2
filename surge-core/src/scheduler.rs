use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ScenarioConfig;
use crate::context::RunContext;
use crate::scenario::Scenario;
use crate::vu::{StartSignal, VuContext, VuState, VuStateCell, run_vu};

/// Stand-in deadline for grace periods too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// How long to wait for an aborted virtual user to unwind.
const ABORT_WAIT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default)]
pub struct SchedulerReport {
    pub vus: u64,
    /// Iterations completed by virtual users that stopped in time.
    pub iterations: u64,
    /// Virtual users still busy when the grace period ran out.
    pub abandoned_vus: u64,
    /// Virtual user tasks that panicked.
    pub failed_vus: u64,
    /// The run was cancelled from outside before `duration` elapsed.
    pub aborted: bool,
    /// Final state of every virtual user, in id order.
    pub states: Vec<VuState>,
}

/// Runs `config.vus` virtual users for `config.duration` at flat concurrency.
///
/// Once the duration is up (or `ctx.cancel` fires) every virtual user is asked to stop.
/// Users that have not stopped when the grace period ends are aborted and reported as
/// abandoned.
pub async fn run<S: Scenario>(
    config: &ScenarioConfig,
    ctx: Arc<RunContext>,
    scenario: Arc<S>,
) -> SchedulerReport {
    let start = Arc::new(StartSignal::new());
    let mut vus = Vec::with_capacity(config.vus.min(usize::MAX as u64) as usize);

    for vu_id in 1..=config.vus {
        let state = Arc::new(VuStateCell::default());
        let vu_ctx = VuContext {
            vu_id,
            run: ctx.clone(),
            pause: config.pause,
            state: state.clone(),
            start: start.clone(),
        };
        let handle = tokio::spawn(run_vu(vu_ctx, scenario.clone()));
        vus.push((vu_id, state, handle));
    }

    start.start();
    debug!(vus = config.vus, duration = ?config.duration, "virtual users started");

    let aborted = tokio::select! {
        _ = tokio::time::sleep(config.duration) => false,
        _ = ctx.cancel.cancelled() => true,
    };
    ctx.cancel.cancel();
    debug!(aborted, "stop signalled, waiting for virtual users");

    let deadline = grace_deadline(Instant::now(), config.grace_period);
    let mut report = SchedulerReport {
        vus: config.vus,
        aborted,
        states: Vec::with_capacity(vus.len()),
        ..SchedulerReport::default()
    };
    let mut aborted_handles = Vec::new();

    for (vu_id, state, mut handle) in vus {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(iterations)) => {
                report.iterations = report.iterations.saturating_add(iterations);
            }
            Ok(Err(err)) => {
                warn!(vu_id, error = %err, "virtual user task failed");
                report.failed_vus += 1;
            }
            Err(_) => {
                handle.abort();
                warn!(
                    vu_id,
                    grace_period = ?config.grace_period,
                    "virtual user did not stop within the grace period, abandoning it"
                );
                report.abandoned_vus += 1;
                aborted_handles.push((vu_id, handle));
            }
        }
        report.states.push(state.get());
    }

    // An aborted task only stops at its next poll; wait so it cannot record after the snapshot.
    for (vu_id, handle) in aborted_handles {
        if tokio::time::timeout(ABORT_WAIT, handle).await.is_err() {
            warn!(vu_id, "aborted virtual user is still running");
        }
    }

    report
}

fn grace_deadline(now: Instant, grace_period: Duration) -> Instant {
    now.checked_add(grace_period)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}
