use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use surge_metrics::MetricHandle;
use tokio::sync::Notify;

use crate::context::RunContext;
use crate::scenario::{Iteration, Scenario};

/// Lifecycle of one virtual user: `Idle -> Running -> (Suspended <-> Running)* -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum VuState {
    Idle = 0,
    Running = 1,
    Suspended = 2,
    Stopped = 3,
}

#[derive(Debug, Default)]
pub struct VuStateCell(AtomicU8);

impl VuStateCell {
    pub fn get(&self) -> VuState {
        match self.0.load(Ordering::Acquire) {
            0 => VuState::Idle,
            1 => VuState::Running,
            2 => VuState::Suspended,
            _ => VuState::Stopped,
        }
    }

    fn set(&self, state: VuState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Releases every waiting virtual user at once.
#[derive(Debug)]
pub struct StartSignal {
    started: AtomicBool,
    notify: Notify,
}

impl StartSignal {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.started.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

impl Default for StartSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct VuContext {
    pub vu_id: u64,
    pub run: Arc<RunContext>,
    pub pause: Duration,
    pub state: Arc<VuStateCell>,
    pub start: Arc<StartSignal>,
}

/// Keeps the `vus` gauge up while a virtual user is active.
pub struct ActiveVuGuard {
    active: Option<MetricHandle>,
}

impl Drop for ActiveVuGuard {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.decrement_gauge();
        }
    }
}

impl VuContext {
    pub fn enter_active_vu(&self) -> ActiveVuGuard {
        let metrics = &self.run.metrics;
        let active = metrics.handle(self.run.vus, &[]);

        if let Some(g) = &active {
            g.increment();
            // Peak tracking, so the summary does not end up with `vus = 0`.
            if let Some(peak) = metrics.handle(self.run.vus_max, &[]) {
                peak.raise_gauge(g.gauge_value());
            }
        }

        ActiveVuGuard { active }
    }

    fn record_iteration(&self, duration: Duration, success: bool) {
        self.run
            .iteration_metrics
            .record_iteration(&self.run.metrics, success, duration);
    }
}

/// Runs iterations until the run is cancelled. Returns the number of completed iterations.
pub async fn run_vu<S: Scenario>(ctx: VuContext, scenario: Arc<S>) -> u64 {
    let cancel = ctx.run.cancel.clone();

    tokio::select! {
        _ = ctx.start.wait() => {}
        _ = cancel.cancelled() => {
            ctx.state.set(VuState::Stopped);
            return 0;
        }
    }

    let _active = ctx.enter_active_vu();
    let mut completed: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        ctx.state.set(VuState::Running);
        let mut it = Iteration::new(ctx.vu_id, completed, ctx.run.clone());
        let started = Instant::now();
        scenario.iteration(&mut it).await;
        ctx.record_iteration(started.elapsed(), it.succeeded());
        completed = completed.saturating_add(1);

        ctx.state.set(VuState::Suspended);
        if ctx.pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                _ = tokio::time::sleep(ctx.pause) => {}
                _ = cancel.cancelled() => break,
            }
        }
    }

    ctx.state.set(VuState::Stopped);
    tracing::debug!(vu_id = ctx.vu_id, iterations = completed, "virtual user stopped");
    completed
}
