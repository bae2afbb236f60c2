use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::run_support::{EnvVars, expand_vars};

const DEFAULT_METHOD: &str = "GET";
const DEFAULT_CHECK_STATUS: u16 = 200;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScenarioYaml {
    /// Run name. Defaults to the file stem.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub vus: Option<u64>,

    #[serde(default)]
    pub duration: Option<YamlDuration>,

    #[serde(default)]
    pub pause: Option<YamlDuration>,

    /// Grace period for in-flight iterations once the duration is up.
    #[serde(default)]
    pub graceful_stop: Option<YamlDuration>,

    /// Per-request timeout.
    #[serde(default)]
    pub timeout: Option<YamlDuration>,

    pub request: RequestYaml,

    #[serde(default)]
    pub checks: Vec<CheckYaml>,

    #[serde(default)]
    pub thresholds: BTreeMap<String, ThresholdExprYaml>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RequestYaml {
    #[serde(default)]
    pub method: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CheckYaml {
    #[serde(default)]
    pub name: Option<String>,
    pub status: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ThresholdExprYaml {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    fn into_inner(self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 10s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let secs = u64::try_from(v).map_err(|_| E::custom("duration cannot be negative"))?;
                Ok(YamlDuration(Duration::from_secs(secs)))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !v.is_finite() || v < 0.0 {
                    return Err(E::custom("duration must be a non-negative, finite number"));
                }
                Duration::try_from_secs_f64(v)
                    .map(YamlDuration)
                    .map_err(E::custom)
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let d = humantime::parse_duration(v.trim()).map_err(E::custom)?;
                Ok(YamlDuration(d))
            }
        }

        deserializer.deserialize_any(V)
    }
}

/// A scenario file turned into core types, with `${VAR}` placeholders expanded.
#[derive(Debug)]
pub(crate) struct LoadedScenario {
    pub options: surge_core::ScenarioOptions,
    pub scenario: surge_core::RequestScenario,
}

pub(crate) async fn load_scenario(path: &Path, env: &EnvVars) -> anyhow::Result<LoadedScenario> {
    let src = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read scenario: {}", path.display()))?;

    let default_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string);

    parse_scenario(&src, default_name, env)
        .with_context(|| format!("invalid scenario: {}", path.display()))
}

pub(crate) fn parse_scenario(
    src: &str,
    default_name: Option<String>,
    env: &EnvVars,
) -> anyhow::Result<LoadedScenario> {
    let doc: ScenarioYaml = serde_yaml::from_str(src).context("failed to parse YAML")?;

    let ScenarioYaml {
        name,
        vus,
        duration,
        pause,
        graceful_stop,
        timeout,
        request,
        checks,
        thresholds,
    } = doc;

    let url = expand_vars(&request.url, env).context("request.url")?;
    let method = request.method.as_deref().unwrap_or(DEFAULT_METHOD);

    let checks = if checks.is_empty() {
        vec![surge_core::StatusCheck::status_is(DEFAULT_CHECK_STATUS)?]
    } else {
        checks
            .into_iter()
            .map(|c| match c.name {
                Some(name) => surge_core::StatusCheck::new(name, c.status),
                None => surge_core::StatusCheck::status_is(c.status),
            })
            .collect::<surge_core::Result<Vec<_>>>()?
    };

    let scenario = surge_core::RequestScenario::new(method, &url, checks)?;

    let options = surge_core::ScenarioOptions {
        name: name.or(default_name),
        vus,
        duration: duration.map(YamlDuration::into_inner),
        pause: pause.map(YamlDuration::into_inner),
        grace_period: graceful_stop.map(YamlDuration::into_inner),
        request_timeout: timeout.map(YamlDuration::into_inner),
        thresholds: threshold_decls(thresholds)?,
    };

    Ok(LoadedScenario { options, scenario })
}

fn threshold_decls(
    raw: BTreeMap<String, ThresholdExprYaml>,
) -> anyhow::Result<Vec<surge_core::ThresholdDecl>> {
    let mut out = Vec::with_capacity(raw.len());

    for (selector, v) in raw {
        let expressions = match v {
            ThresholdExprYaml::One(s) => vec![s],
            ThresholdExprYaml::Many(v) => v,
        };

        if expressions.is_empty() {
            anyhow::bail!("invalid thresholds for `{selector}`: empty list");
        }

        out.push(surge_core::ThresholdDecl {
            selector,
            expressions,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EnvVars {
        [("BASE_URL".to_string(), "http://127.0.0.1:8080".to_string())]
            .into_iter()
            .collect()
    }

    fn parse(src: &str) -> LoadedScenario {
        parse_scenario(src, Some("file-stem".to_string()), &env())
            .unwrap_or_else(|e| panic!("parse failed: {e:#}"))
    }

    #[test]
    fn parses_full_document() {
        let loaded = parse(
            r#"
name: smoke
vus: 2
duration: 10s
pause: 250ms
gracefulStop: 5
timeout: 1.5
request:
  method: post
  url: ${BASE_URL}/items
checks:
  - name: created
    status: 201
  - status: 200
thresholds:
  'http_reqs{expected_response:true}': ['rate>10', 'count>0']
  http_req_duration: p(95)<500
"#,
        );

        let o = &loaded.options;
        assert_eq!(o.name.as_deref(), Some("smoke"));
        assert_eq!(o.vus, Some(2));
        assert_eq!(o.duration, Some(Duration::from_secs(10)));
        assert_eq!(o.pause, Some(Duration::from_millis(250)));
        assert_eq!(o.grace_period, Some(Duration::from_secs(5)));
        assert_eq!(o.request_timeout, Some(Duration::from_millis(1500)));

        // BTreeMap order.
        assert_eq!(o.thresholds.len(), 2);
        assert_eq!(o.thresholds[0].selector, "http_req_duration");
        assert_eq!(o.thresholds[0].expressions, vec!["p(95)<500".to_string()]);
        assert_eq!(o.thresholds[1].selector, "http_reqs{expected_response:true}");
        assert_eq!(o.thresholds[1].expressions.len(), 2);

        let s = &loaded.scenario;
        assert_eq!(s.method().as_str(), "POST");
        assert_eq!(s.url(), "http://127.0.0.1:8080/items");
        let names: Vec<&str> = s.checks().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["created", "status is 200"]);
    }

    #[test]
    fn minimal_document_uses_defaults() {
        let loaded = parse(
            r#"
duration: 1s
request:
  url: http://example.com/
"#,
        );

        assert_eq!(loaded.options.name.as_deref(), Some("file-stem"));
        assert_eq!(loaded.options.vus, None);
        assert!(loaded.options.thresholds.is_empty());
        assert_eq!(loaded.scenario.method().as_str(), "GET");
        assert_eq!(loaded.scenario.checks().len(), 1);
        assert_eq!(loaded.scenario.checks()[0].name, "status is 200");
        assert_eq!(loaded.scenario.checks()[0].status, 200);
    }

    #[test]
    fn rejects_bad_documents() {
        let cases = [
            // Missing request.
            "duration: 1s\n",
            // Negative duration.
            "duration: -1\nrequest:\n  url: http://example.com/\n",
            // Too large to fit a duration.
            "duration: 1e300\nrequest:\n  url: http://example.com/\n",
            // Unknown placeholder.
            "duration: 1s\nrequest:\n  url: ${NOPE}/\n",
            // Non-http target.
            "duration: 1s\nrequest:\n  url: ftp://example.com/\n",
            // Bad method.
            "duration: 1s\nrequest:\n  method: 'GE T'\n  url: http://example.com/\n",
            // Empty expression list.
            "duration: 1s\nrequest:\n  url: http://example.com/\nthresholds:\n  http_reqs: []\n",
            // Check status out of range.
            "duration: 1s\nrequest:\n  url: http://example.com/\nchecks:\n  - status: 42\n",
        ];

        for src in cases {
            assert!(
                parse_scenario(src, None, &env()).is_err(),
                "expected error for:\n{src}"
            );
        }
    }
}
