use std::sync::Arc;
use std::time::{Duration, Instant};

use audit_engine::{
    ClientSettings, EngineConfig, EngineEvent, EngineHandle, PollEvent, ReqwestAuditApi,
    SubmitError, Timer,
};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct NoWait;

#[async_trait::async_trait]
impl Timer for NoWait {
    async fn sleep(&self, _duration: Duration) {}
}

fn engine_for(server: &MockServer, dir: &TempDir) -> EngineHandle {
    let base = Url::parse(&format!("{}/api/", server.uri())).unwrap();
    let client = ClientSettings::with_base_url(base);
    let config = EngineConfig {
        client: client.clone(),
        clock: Arc::new(|| Utc.with_ymd_and_hms(2024, 5, 3, 12, 30, 0).unwrap()),
        ..EngineConfig::new(dir.path().to_path_buf())
    };
    let api = Arc::new(ReqwestAuditApi::new(client).unwrap());
    EngineHandle::with_parts(config, api, Arc::new(NoWait))
}

fn wait_for<F>(engine: &EngineHandle, mut done: F) -> Vec<EngineEvent>
where
    F: FnMut(&EngineEvent) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        if let Some(event) = engine.recv_timeout(Duration::from_millis(50)) {
            let finished = done(&event);
            seen.push(event);
            if finished {
                return seen;
            }
        }
    }
    panic!("engine did not finish in time; saw {seen:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_reports_accepted_job_with_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/audit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"auditId": "abc"})))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server, &temp);
    engine.submit("https://example.com");

    let events = tokio::task::spawn_blocking(move || wait_for(&engine, |_| true))
        .await
        .unwrap();
    assert_eq!(
        events,
        vec![EngineEvent::AuditAccepted {
            job_id: "abc".into(),
            url: "https://example.com".into(),
            created_at: "2024-05-03T12:30:00.000Z".into(),
        }]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_submission_saves_dated_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/audit"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("a,b\n", "text/csv"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server, &temp);
    engine.submit("https://example.com");

    let events = tokio::task::spawn_blocking(move || wait_for(&engine, |_| true))
        .await
        .unwrap();
    let expected_path = temp.path().join("data-2024-05-03.csv");
    assert_eq!(
        events,
        vec![EngineEvent::SyncFileSaved {
            file_name: "data-2024-05-03.csv".into(),
            path: expected_path.clone(),
        }]
    );
    assert_eq!(std::fs::read_to_string(expected_path).unwrap(), "a,b\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_submission_fails_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server, &temp);
    engine.submit("not a url");

    let events = tokio::task::spawn_blocking(move || wait_for(&engine, |_| true))
        .await
        .unwrap();
    assert!(matches!(
        &events[0],
        EngineEvent::SubmissionFailed(SubmitError::Client(err))
            if err.to_string() == "Please enter a valid URL"
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn polling_runs_to_completion_and_materializes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/audit/abc/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "completed"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/audit/abc/download"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "downloadUrl": format!("{}/files/abc.csv", server.uri()),
            "fileName": "abc.csv"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/abc.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("url\n", "text/csv"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server, &temp);
    engine.start_polling("abc".into());

    let (engine, events) = tokio::task::spawn_blocking(move || {
        let events = wait_for(&engine, |event| {
            matches!(event, EngineEvent::Poll(PollEvent::Completed { .. }))
        });
        (engine, events)
    })
    .await
    .unwrap();
    let Some(EngineEvent::Poll(PollEvent::Completed { download, .. })) = events.last() else {
        panic!("expected completion, got {events:?}");
    };

    engine.materialize(download.download_url.clone(), "audit-abc.csv");
    let events = tokio::task::spawn_blocking(move || wait_for(&engine, |_| true))
        .await
        .unwrap();
    assert_eq!(
        events,
        vec![EngineEvent::Materialized {
            file_name: "audit-abc.csv".into(),
            result: Ok(temp.path().join("audit-abc.csv")),
        }]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn ledger_load_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/audit"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server, &temp);
    engine.load_ledger();

    let events = tokio::task::spawn_blocking(move || wait_for(&engine, |_| true))
        .await
        .unwrap();
    let EngineEvent::LedgerLoaded(Err(err)) = &events[0] else {
        panic!("expected load failure, got {events:?}");
    };
    assert_eq!(err.status(), Some(500));
}
