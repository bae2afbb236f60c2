use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::Context as _;
use serde_json::Value;
use surge_testserver::TestServer;

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn describe(out: &Output) -> String {
    format!(
        "exit code {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    )
}

fn write_scenario(dir: &Path, name: &str, body: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

async fn run_surge(args: Vec<String>, base_url: Option<String>) -> anyhow::Result<Output> {
    let exe = env!("CARGO_BIN_EXE_surge");

    tokio::task::spawn_blocking(move || {
        let mut cmd = Command::new(exe);
        cmd.args(&args)
            .env_remove("SURGE_RUN_NAME")
            .env_remove("SURGE_RUN_PARAMS");
        if let Some(url) = base_url {
            cmd.env("BASE_URL", url);
        }
        cmd.output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run surge binary")
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_surge");

    let out = Command::new(exe)
        .arg("run")
        .arg("./does-not-matter.yaml")
        .arg("--duration")
        .arg("10x")
        .output()
        .context("run surge binary")?;

    anyhow::ensure!(status_code(out.status) == 30, "expected 30, got {}", describe(&out));
    Ok(())
}

#[tokio::test]
async fn invalid_scenarios_exit_30() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;

    let missing = dir.path().join("missing.yaml");
    let bad_yaml = write_scenario(dir.path(), "bad.yaml", "vus: [1, 2\n")?;
    let bad_threshold = write_scenario(
        dir.path(),
        "bad_threshold.yaml",
        "duration: 1s\nrequest:\n  url: http://127.0.0.1:1/\nthresholds:\n  http_reqs: 'bogus>1'\n",
    )?;
    let zero_vus = write_scenario(
        dir.path(),
        "zero_vus.yaml",
        "vus: 0\nduration: 1s\nrequest:\n  url: http://127.0.0.1:1/\n",
    )?;

    for path in [missing, bad_yaml, bad_threshold, zero_vus] {
        let out = run_surge(vec!["run".into(), path.display().to_string()], None).await?;
        anyhow::ensure!(
            status_code(out.status) == 30,
            "expected 30 for {}, got {}",
            path.display(),
            describe(&out)
        );
        anyhow::ensure!(
            out.stdout.is_empty(),
            "nothing should run for {}, got {}",
            path.display(),
            describe(&out)
        );
    }

    Ok(())
}

#[tokio::test]
async fn thresholds_failed_exit_11() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let dir = tempfile::tempdir().context("tempdir")?;
    let path = write_scenario(
        dir.path(),
        "error.yaml",
        r#"
vus: 2
duration: 1s
request:
  url: ${BASE_URL}/error
thresholds:
  http_req_failed: rate<0.5
"#,
    )?;

    let out = run_surge(
        vec!["run".into(), path.display().to_string()],
        Some(server.base_url().to_string()),
    )
    .await?;

    let errors = server.stats().errors_total();
    server.shutdown().await;

    anyhow::ensure!(status_code(out.status) == 11, "expected 11, got {}", describe(&out));
    anyhow::ensure!(errors > 0, "target was never hit: {}", describe(&out));
    Ok(())
}

#[tokio::test]
async fn passing_run_exit_0_with_json_summary() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let dir = tempfile::tempdir().context("tempdir")?;
    let path = write_scenario(
        dir.path(),
        "ok.yaml",
        r#"
name: smoke
vus: 2
duration: 1s
request:
  url: ${BASE_URL}/
checks:
  - name: is ok
    status: 200
thresholds:
  'http_reqs{expected_response:true}': count>0
  http_req_failed: ['rate==0']
  'checks{check:is ok}': rate==1
"#,
    )?;

    let out = run_surge(
        vec![
            "run".into(),
            path.display().to_string(),
            "--output".into(),
            "json".into(),
            "--progress-interval".into(),
            "200ms".into(),
            "--params".into(),
            "build=42".into(),
        ],
        Some(server.base_url().to_string()),
    )
    .await?;
    server.shutdown().await;

    anyhow::ensure!(status_code(out.status) == 0, "expected 0, got {}", describe(&out));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines = stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(serde_json::from_str::<Value>)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("stdout is not NDJSON:\n{stdout}"))?;

    let kinds: Vec<&str> = lines
        .iter()
        .filter_map(|v| v.get("kind").and_then(Value::as_str))
        .collect();
    anyhow::ensure!(
        kinds.iter().any(|k| *k == "progress"),
        "no progress lines: {kinds:?}"
    );
    anyhow::ensure!(kinds.last() == Some(&"summary"), "summary must be last: {kinds:?}");

    let summary = lines.last().context("no summary line")?;
    anyhow::ensure!(summary.get("passed").and_then(Value::as_bool) == Some(true));
    anyhow::ensure!(
        summary
            .get("run_name")
            .and_then(Value::as_str)
            .is_some_and(|n| n.starts_with("smoke ")),
        "unexpected run name: {summary}"
    );
    anyhow::ensure!(
        summary.get("run_params").and_then(Value::as_str) == Some("build=42"),
        "unexpected run params: {summary}"
    );

    let verdicts: Vec<&str> = summary
        .get("thresholds")
        .and_then(Value::as_array)
        .context("thresholds array")?
        .iter()
        .filter_map(|t| t.get("verdict").and_then(Value::as_str))
        .collect();
    anyhow::ensure!(verdicts == vec!["pass", "pass", "pass"], "verdicts: {verdicts:?}");

    let has_ok_series = summary
        .get("series")
        .and_then(Value::as_array)
        .context("series array")?
        .iter()
        .any(|s| {
            s.get("name").and_then(Value::as_str) == Some("http_reqs")
                && s.pointer("/tags/expected_response").and_then(Value::as_str) == Some("true")
        });
    anyhow::ensure!(has_ok_series, "missing http_reqs{{expected_response:true}}: {summary}");

    Ok(())
}
