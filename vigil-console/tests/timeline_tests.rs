use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get,
};
use console::{ApiClient, LevelFilter, TimelineFeed, TimelineFilter};
use contracts::{LogEntry, LogLevel, LogSource, TimelineResponse};

mod common;
use common::{base_url, log_entry, spawn_server};

#[derive(Clone)]
struct TimelineMock {
    entries: Arc<Mutex<Vec<LogEntry>>>,
    fail: Arc<AtomicBool>,
    fetch_calls: Arc<AtomicUsize>,
}

impl TimelineMock {
    fn new(entries: Vec<LogEntry>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
            fail: Arc::new(AtomicBool::new(false)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

fn timeline_router(mock: TimelineMock) -> Router {
    Router::new()
        .route(
            "/api/logs/timeline",
            get(|State(mock): State<TimelineMock>| async move {
                mock.fetch_calls.fetch_add(1, Ordering::SeqCst);
                if mock.fail.load(Ordering::SeqCst) {
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
                let entries = mock.entries.lock().expect("entries lock").clone();
                let total_count = entries.len() as u64;
                Json(TimelineResponse {
                    entries,
                    total_count,
                })
                .into_response()
            }),
        )
        .with_state(mock)
}

fn mixed_entries() -> Vec<LogEntry> {
    vec![
        log_entry("1", LogLevel::Info, LogSource::Compiler, "compile finished"),
        log_entry("2", LogLevel::Error, LogSource::Sandbox, "syscall denied"),
        log_entry("3", LogLevel::Debug, LogSource::Fuzzer, "corpus reloaded"),
    ]
}

#[tokio::test]
async fn refresh_replaces_snapshot_in_full() {
    let mock = TimelineMock::new(mixed_entries());
    let (addr, _handle) = spawn_server(timeline_router(mock.clone())).await;

    let feed = TimelineFeed::new(
        Arc::new(ApiClient::new(&base_url(addr))),
        Duration::from_secs(5),
    );
    feed.refresh().await;
    assert_eq!(feed.snapshot().await.entries.len(), 3);

    // A server-side deletion and a new entry are both reflected exactly.
    *mock.entries.lock().expect("entries lock") = vec![
        log_entry("2", LogLevel::Error, LogSource::Sandbox, "syscall denied"),
        log_entry("4", LogLevel::Critical, LogSource::System, "watchdog fired"),
    ];
    feed.refresh().await;

    let snapshot = feed.snapshot().await;
    assert_eq!(snapshot.total_count, 2);
    let ids: Vec<&str> = snapshot.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "4"]);
}

#[tokio::test]
async fn level_and_search_filters_narrow_the_view() {
    let mock = TimelineMock::new(mixed_entries());
    let (addr, _handle) = spawn_server(timeline_router(mock)).await;

    let feed = TimelineFeed::new(
        Arc::new(ApiClient::new(&base_url(addr))),
        Duration::from_secs(5),
    );
    feed.refresh().await;

    let by_level = TimelineFilter {
        level: LevelFilter::parse("error").expect("filter should parse"),
        search: String::new(),
    };
    let shown = feed.filtered(&by_level).await;
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].level, LogLevel::Error);

    let narrowed = TimelineFilter {
        level: LevelFilter::parse("error").expect("filter should parse"),
        search: "SANDBOX".to_string(),
    };
    assert_eq!(feed.filtered(&narrowed).await.len(), 1);

    let excluded = TimelineFilter {
        level: LevelFilter::parse("error").expect("filter should parse"),
        search: "compiler".to_string(),
    };
    assert!(feed.filtered(&excluded).await.is_empty());
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let mock = TimelineMock::new(mixed_entries());
    let (addr, _handle) = spawn_server(timeline_router(mock.clone())).await;

    let feed = TimelineFeed::new(
        Arc::new(ApiClient::new(&base_url(addr))),
        Duration::from_secs(5),
    );
    feed.refresh().await;
    assert_eq!(feed.snapshot().await.entries.len(), 3);

    mock.fail.store(true, Ordering::SeqCst);
    feed.refresh().await;

    // Stale-but-valid: the previous set stays visible.
    assert_eq!(feed.snapshot().await.entries.len(), 3);
}

#[tokio::test]
async fn refresh_loop_stops_after_shutdown() {
    let mock = TimelineMock::new(mixed_entries());
    let (addr, _handle) = spawn_server(timeline_router(mock.clone())).await;

    let feed = TimelineFeed::new(
        Arc::new(ApiClient::new(&base_url(addr))),
        Duration::from_millis(50),
    );
    feed.spawn_refresh_loop();
    tokio::time::sleep(Duration::from_millis(180)).await;
    feed.shutdown();

    // Give any request already accepted by the server time to land before
    // sampling the counter.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let calls_at_shutdown = mock.fetch_calls.load(Ordering::SeqCst);
    assert!(calls_at_shutdown >= 2);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(mock.fetch_calls.load(Ordering::SeqCst), calls_at_shutdown);
}
