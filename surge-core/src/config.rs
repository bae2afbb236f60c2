use std::time::Duration;

use crate::error::{Error, Result};
use crate::thresholds::{ThresholdDecl, ThresholdSet, parse_selector, parse_threshold_expr};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Overrides supplied on the command line. They win over file values.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub vus: Option<u64>,
    pub duration: Option<Duration>,
    pub pause: Option<Duration>,
    pub grace_period: Option<Duration>,
    pub name: Option<String>,
    /// Free-form text attached to the run identity.
    pub params: Option<String>,
}

/// Values read from a scenario file. Everything is optional here and validated later.
#[derive(Debug, Clone, Default)]
pub struct ScenarioOptions {
    pub name: Option<String>,
    pub vus: Option<u64>,
    pub duration: Option<Duration>,
    pub pause: Option<Duration>,
    pub grace_period: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub thresholds: Vec<ThresholdDecl>,
}

/// Validated run shape. Built once by [`scenario_from_options`].
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub name: Option<String>,
    pub params: Option<String>,
    pub vus: u64,
    pub duration: Duration,
    /// Pause between two iterations of the same virtual user.
    pub pause: Duration,
    /// How long stopped virtual users may take to finish their in-flight iteration.
    pub grace_period: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub thresholds: Vec<ThresholdSet>,
}

pub fn scenario_from_options(opts: ScenarioOptions, cfg: RunConfig) -> Result<ScenarioConfig> {
    let vus = cfg.vus.or(opts.vus).unwrap_or(1);
    if vus == 0 {
        return Err(Error::InvalidVus);
    }

    let duration = cfg
        .duration
        .or(opts.duration)
        .ok_or(Error::MissingDuration)?;

    let request_timeout = opts.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
    if request_timeout.is_zero() {
        return Err(Error::InvalidTimeout);
    }

    let thresholds = opts
        .thresholds
        .into_iter()
        .map(parse_threshold_set)
        .collect::<Result<Vec<_>>>()?;

    Ok(ScenarioConfig {
        name: cfg.name.or(opts.name).filter(|n| !n.trim().is_empty()),
        params: cfg.params,
        vus,
        duration,
        pause: cfg.pause.or(opts.pause).unwrap_or(Duration::ZERO),
        grace_period: cfg
            .grace_period
            .or(opts.grace_period)
            .unwrap_or(DEFAULT_GRACE_PERIOD),
        request_timeout,
        connect_timeout: DEFAULT_CONNECT_TIMEOUT.min(request_timeout),
        thresholds,
    })
}

fn parse_threshold_set(decl: ThresholdDecl) -> Result<ThresholdSet> {
    let selector =
        parse_selector(&decl.selector).map_err(|reason| Error::InvalidThresholdSelector {
            selector: decl.selector.clone(),
            reason,
        })?;

    let expressions = decl
        .expressions
        .iter()
        .map(|raw| {
            parse_threshold_expr(raw).map_err(|reason| Error::InvalidThreshold {
                selector: decl.selector.clone(),
                expression: raw.clone(),
                reason,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ThresholdSet {
        selector,
        source: decl.selector,
        expressions,
    })
}
