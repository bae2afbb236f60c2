use std::future::Future;
use std::sync::Arc;

use surge_http::Method;

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::http::Outcome;

/// Body executed once per iteration by every virtual user.
///
/// One instance is shared by all virtual users of a run. Implementations may be written
/// with `async fn`.
pub trait Scenario: Send + Sync + 'static {
    fn iteration(&self, it: &mut Iteration) -> impl Future<Output = ()> + Send;
}

/// Per-iteration handle passed to [`Scenario::iteration`].
///
/// The iteration counts as a success only if every check passed and every request got an
/// expected response.
pub struct Iteration {
    vu_id: u64,
    number: u64,
    ctx: Arc<RunContext>,
    failed: bool,
}

impl Iteration {
    pub(crate) fn new(vu_id: u64, number: u64, ctx: Arc<RunContext>) -> Self {
        Self {
            vu_id,
            number,
            ctx,
            failed: false,
        }
    }

    /// 1-based virtual user id.
    pub fn vu_id(&self) -> u64 {
        self.vu_id
    }

    /// 0-based iteration number within this virtual user.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// True once the run is winding down. Long bodies may use it to return early.
    pub fn is_cancelled(&self) -> bool {
        self.ctx.cancel.is_cancelled()
    }

    pub async fn request(&mut self, method: Method, url: &str) -> Outcome {
        let outcome = self.ctx.http.execute(method, url).await;
        if !outcome.is_expected() {
            self.failed = true;
        }
        outcome
    }

    pub async fn get(&mut self, url: &str) -> Outcome {
        self.request(Method::GET, url).await
    }

    /// Records a named pass/fail assertion and returns `passed`.
    pub fn check(&mut self, name: &str, passed: bool) -> bool {
        self.ctx
            .checks
            .record_check(&self.ctx.metrics, name, passed);
        if !passed {
            self.failed = true;
        }
        passed
    }

    pub fn succeeded(&self) -> bool {
        !self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCheck {
    pub name: String,
    pub status: u16,
}

impl StatusCheck {
    pub fn new(name: impl Into<String>, status: u16) -> Result<Self> {
        let name = name.into();
        if !(100..=599).contains(&status) {
            return Err(Error::InvalidCheck(name));
        }
        Ok(Self { name, status })
    }

    /// `status is <code>`.
    pub fn status_is(status: u16) -> Result<Self> {
        Self::new(format!("status is {status}"), status)
    }
}

/// One request per iteration followed by status checks.
#[derive(Debug, Clone)]
pub struct RequestScenario {
    method: Method,
    url: String,
    checks: Vec<StatusCheck>,
}

impl RequestScenario {
    pub fn new(method: &str, url: &str, checks: Vec<StatusCheck>) -> Result<Self> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidMethod(method.to_string()))?;

        let parsed = url::Url::parse(url.trim()).map_err(|_| Error::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(Error::InvalidUrl(url.to_string()));
        }

        Ok(Self {
            method,
            url: url.trim().to_string(),
            checks,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn checks(&self) -> &[StatusCheck] {
        &self.checks
    }
}

impl Scenario for RequestScenario {
    async fn iteration(&self, it: &mut Iteration) {
        let outcome = it.request(self.method.clone(), &self.url).await;
        for check in &self.checks {
            it.check(&check.name, outcome.status() == Some(check.status));
        }
    }
}
