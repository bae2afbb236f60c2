use std::time::{Duration, Instant};

use surge_core::{
    CHECKS, HTTP_REQ_ERRORS, HTTP_REQ_FAILED, HTTP_REQS, RequestScenario, RunConfig,
    RunController, ScenarioOptions, StatusCheck, ThresholdDecl, Verdict, scenario_from_options,
};
use surge_testserver::TestServer;

fn options(duration: Duration, grace: Duration) -> ScenarioOptions {
    ScenarioOptions {
        name: Some("it".to_string()),
        vus: Some(2),
        duration: Some(duration),
        grace_period: Some(grace),
        thresholds: vec![ThresholdDecl {
            selector: "http_reqs{expected_response:true}".to_string(),
            expressions: vec!["rate>10".to_string()],
        }],
        ..ScenarioOptions::default()
    }
}

fn scenario(url: &str) -> RequestScenario {
    let check = StatusCheck::status_is(200).unwrap_or_else(|e| panic!("{e}"));
    RequestScenario::new("GET", url, vec![check]).unwrap_or_else(|e| panic!("{e}"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn healthy_target_passes_rate_threshold() {
    let server = TestServer::start()
        .await
        .unwrap_or_else(|e| panic!("start test server: {e}"));

    let config = scenario_from_options(
        options(Duration::from_secs(2), Duration::from_secs(5)),
        RunConfig::default(),
    )
    .unwrap_or_else(|e| panic!("{e}"));

    let result = RunController::new(config)
        .run(scenario(&server.urls().slow))
        .await;

    let snap = &result.snapshot;
    let ok = snap
        .query(HTTP_REQS)
        .where_eq("expected_response", "true")
        .sum_counter()
        .unwrap_or(0);
    // 2 vus x 2s at ~50ms per request is ~80.
    assert!(ok >= 50, "expected close to 80 requests, got {ok}");
    assert_eq!(
        snap.query(HTTP_REQS)
            .where_eq("expected_response", "false")
            .sum_counter(),
        None
    );
    assert_eq!(snap.query(HTTP_REQ_FAILED).sum_rate().map(|(hits, _)| hits), Some(0));
    assert_eq!(
        snap.query(CHECKS)
            .where_eq("check", "status is 200")
            .sum_rate()
            .map(|(hits, total)| hits == total),
        Some(true)
    );

    assert_eq!(result.thresholds.len(), 1);
    assert_eq!(result.thresholds[0].verdict, Verdict::Pass);
    assert!(result.passed());
    assert_eq!(result.abandoned_vus(), 0);
    assert!(server.stats().requests_total() >= ok);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_target_fails_rate_threshold() {
    let server = TestServer::start()
        .await
        .unwrap_or_else(|e| panic!("start test server: {e}"));

    let config = scenario_from_options(
        options(Duration::from_secs(1), Duration::from_secs(5)),
        RunConfig::default(),
    )
    .unwrap_or_else(|e| panic!("{e}"));

    let result = RunController::new(config)
        .run(scenario(&server.urls().error))
        .await;

    let snap = &result.snapshot;
    assert_eq!(
        snap.query(HTTP_REQS)
            .where_eq("expected_response", "true")
            .sum_counter(),
        None
    );
    let failed = snap
        .query(HTTP_REQS)
        .where_eq("expected_response", "false")
        .where_eq("status", "500")
        .sum_counter()
        .unwrap_or(0);
    assert!(failed > 0);

    assert_eq!(result.thresholds[0].verdict, Verdict::Indeterminate);
    assert!(!result.passed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_target_completes_within_duration_and_grace() {
    let duration = Duration::from_secs(1);
    let grace = Duration::from_secs(2);
    let config = scenario_from_options(
        ScenarioOptions {
            request_timeout: Some(Duration::from_millis(500)),
            ..options(duration, grace)
        },
        RunConfig::default(),
    )
    .unwrap_or_else(|e| panic!("{e}"));

    let started = Instant::now();
    let result = RunController::new(config)
        .run(scenario("http://127.0.0.1:1/"))
        .await;
    let elapsed = started.elapsed();

    assert!(
        elapsed < duration + grace + Duration::from_secs(1),
        "run did not finish in time: {elapsed:?}"
    );

    let snap = &result.snapshot;
    let (hits, total) = snap
        .query(HTTP_REQ_FAILED)
        .sum_rate()
        .unwrap_or_else(|| panic!("no requests recorded"));
    assert!(total > 0);
    assert_eq!(hits, total);
    assert!(snap.query(HTTP_REQ_ERRORS).sum_counter().unwrap_or(0) > 0);

    let (checks_passed, _) = snap
        .query(CHECKS)
        .sum_rate()
        .unwrap_or_else(|| panic!("no checks recorded"));
    assert_eq!(checks_passed, 0);

    assert!(!result.passed());
}
