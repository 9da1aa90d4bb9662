//! Notification history tests against a mock REST backend: cache
//! synchronization, read/unread accounting, deletion, and failure
//! handling.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use taskwire_client::{
    ClientConfig, ClientEvent, EventKind, HistoryQuery, NotificationClient, PageLoader,
    PresentError, Presenter,
};
use taskwire_protocol::{NotificationStatus, TaskStatusEvent};

// ─────────────────────────────────────────────────────────────────────
// Mock notification store
// ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct StoreState {
    /// Envelope returned from the history listing
    history_body: Arc<Mutex<Value>>,
    /// Envelope returned from the unread-count endpoint
    unread_body: Arc<Mutex<Value>>,
    /// When set, every mutation returns HTTP 500
    fail_mutations: Arc<AtomicBool>,
    /// Method + path + query of each request, in order
    requests: Arc<Mutex<Vec<String>>>,
    /// Authorization header of each request, in order
    auth: Arc<Mutex<Vec<String>>>,
}

struct MockStore {
    addr: SocketAddr,
    state: StoreState,
}

async fn spawn_store() -> MockStore {
    let state = StoreState {
        history_body: Arc::new(Mutex::new(history_envelope(vec![]))),
        unread_body: Arc::new(Mutex::new(unread_envelope(0))),
        fail_mutations: Arc::new(AtomicBool::new(false)),
        requests: Arc::new(Mutex::new(Vec::new())),
        auth: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/api/task/notifications", get(list_notifications))
        .route("/api/task/notifications/unread-count", get(unread_count))
        .route("/api/task/notifications/read-all", put(read_all))
        .route("/api/task/notifications/{id}/read", put(mark_one_read))
        .route("/api/task/notifications/{id}", delete(remove_one))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockStore { addr, state }
}

fn record_request(state: &StoreState, headers: &HeaderMap, line: String) {
    state.requests.lock().push(line);
    state.auth.lock().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string(),
    );
}

async fn list_notifications(
    State(state): State<StoreState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    record_request(
        &state,
        &headers,
        format!("GET /notifications?{}", query.unwrap_or_default()),
    );
    Json(state.history_body.lock().clone())
}

async fn unread_count(State(state): State<StoreState>, headers: HeaderMap) -> Json<Value> {
    record_request(&state, &headers, "GET /notifications/unread-count".into());
    Json(state.unread_body.lock().clone())
}

fn mutation_response(state: &StoreState) -> Response {
    if state.fail_mutations.load(Ordering::SeqCst) {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    } else {
        Json(json!({"code": 200, "message": "ok", "data": null})).into_response()
    }
}

async fn mark_one_read(
    State(state): State<StoreState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    record_request(&state, &headers, format!("PUT /notifications/{id}/read"));
    mutation_response(&state)
}

async fn read_all(State(state): State<StoreState>, headers: HeaderMap) -> Response {
    record_request(&state, &headers, "PUT /notifications/read-all".into());
    mutation_response(&state)
}

async fn remove_one(
    State(state): State<StoreState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    record_request(&state, &headers, format!("DELETE /notifications/{id}"));
    mutation_response(&state)
}

// ─────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────

fn record(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "task_id": format!("task-{id}"),
        "task_type": "resume_parse",
        "task_title": "Resume parse",
        "status": status,
        "message": "done",
        "created_at": "2026-08-29T10:00:00Z",
    })
}

fn history_envelope(records: Vec<Value>) -> Value {
    let total = records.len();
    json!({
        "code": 200,
        "message": "ok",
        "data": {
            "notifications": records,
            "total": total,
            "skip": 0,
            "limit": 20,
        },
    })
}

fn unread_envelope(count: u64) -> Value {
    json!({"code": 200, "message": "ok", "data": {"unread_count": count}})
}

struct NullPresenter;

impl Presenter for NullPresenter {
    fn task_completed(&self, _: &TaskStatusEvent) -> Result<(), PresentError> {
        Ok(())
    }
    fn task_failed(&self, _: &TaskStatusEvent) -> Result<(), PresentError> {
        Ok(())
    }
    fn task_processing(&self, _: &str, _: &str) -> Result<(), PresentError> {
        Ok(())
    }
}

struct NullLoader;

impl PageLoader for NullLoader {
    fn load(&self, _: &str) -> Result<(), PresentError> {
        Ok(())
    }
}

fn test_client(addr: SocketAddr) -> NotificationClient {
    let config = ClientConfig {
        http_base: format!("http://{addr}"),
        ws_base: format!("ws://{addr}"),
        ..ClientConfig::default()
    };
    NotificationClient::new(config, Arc::new(NullPresenter), Arc::new(NullLoader))
}

/// Forward every event of one kind into a channel. REST operations emit
/// before their future resolves, so `try_recv` after the await is
/// deterministic.
fn event_channel(
    client: &NotificationClient,
    kind: EventKind,
) -> mpsc::UnboundedReceiver<ClientEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.on(kind, move |event| {
        let _ = tx.send(event.clone());
    });
    rx
}

// ─────────────────────────────────────────────────────────────────────
// History fetch
// ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_history_fills_the_cache_and_counts_unread() {
    let store = spawn_store().await;
    *store.state.history_body.lock() = history_envelope(vec![
        record(1, "sent"),
        record(2, "pending"),
        record(3, "read"),
    ]);
    let client = test_client(store.addr);
    let mut loaded = event_channel(&client, EventKind::HistoryLoaded);

    client.fetch_history("tok", HistoryQuery::default()).await;

    assert_eq!(client.history().len(), 3);
    assert_eq!(client.unread_count(), 2);
    match loaded.try_recv().unwrap() {
        ClientEvent::HistoryLoaded(records) => assert_eq!(records.len(), 3),
        other => panic!("expected history loaded, got {other:?}"),
    }
    assert_eq!(store.state.auth.lock()[0], "Bearer tok");
}

#[tokio::test]
async fn fetch_history_sends_paging_and_filter_parameters() {
    let store = spawn_store().await;
    let client = test_client(store.addr);

    let query = HistoryQuery {
        skip: 40,
        limit: 10,
        unread_only: true,
        status: Some("failed".into()),
        task_type: Some("resume_parse".into()),
    };
    client.fetch_history("tok", query).await;

    let requests = store.state.requests.lock();
    let line = &requests[0];
    assert!(line.starts_with("GET /notifications?"), "{line}");
    for param in [
        "skip=40",
        "limit=10",
        "unread_only=true",
        "status=failed",
        "task_type=resume_parse",
    ] {
        assert!(line.contains(param), "missing {param} in {line}");
    }
}

#[tokio::test]
async fn fetch_history_replaces_the_cache_wholesale() {
    let store = spawn_store().await;
    *store.state.history_body.lock() = history_envelope(vec![
        record(1, "sent"),
        record(2, "sent"),
        record(3, "sent"),
    ]);
    let client = test_client(store.addr);

    client.fetch_history("tok", HistoryQuery::default()).await;
    assert_eq!(client.history().len(), 3);
    assert_eq!(client.unread_count(), 3);

    *store.state.history_body.lock() = history_envelope(vec![record(9, "read")]);
    client.fetch_history("tok", HistoryQuery::default()).await;

    let records = client.history();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 9);
    assert_eq!(client.unread_count(), 0);
}

#[tokio::test]
async fn failed_history_fetch_leaves_the_cache_and_reports() {
    let store = spawn_store().await;
    *store.state.history_body.lock() = history_envelope(vec![record(1, "sent")]);
    let client = test_client(store.addr);
    client.fetch_history("tok", HistoryQuery::default()).await;

    // Envelope-level failure: HTTP 200 but a non-success code.
    *store.state.history_body.lock() =
        json!({"code": 500, "message": "store unavailable", "data": null});
    let mut errors = event_channel(&client, EventKind::Error);
    client.fetch_history("tok", HistoryQuery::default()).await;

    assert_eq!(client.history().len(), 1);
    assert_eq!(client.unread_count(), 1);
    assert!(matches!(errors.try_recv().unwrap(), ClientEvent::Error(_)));
}

// ─────────────────────────────────────────────────────────────────────
// Read accounting
// ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mark_read_mutates_the_record_and_decrements_unread() {
    let store = spawn_store().await;
    *store.state.history_body.lock() =
        history_envelope(vec![record(1, "sent"), record(2, "sent")]);
    let client = test_client(store.addr);
    client.fetch_history("tok", HistoryQuery::default()).await;
    let mut updated = event_channel(&client, EventKind::NotificationsUpdated);

    client.mark_read(1, "tok").await;

    let records = client.history();
    assert_eq!(records[0].status, NotificationStatus::Read);
    assert_eq!(records[1].status, NotificationStatus::Sent);
    assert_eq!(client.unread_count(), 1);
    assert!(updated.try_recv().is_ok());
    assert!(
        store
            .state
            .requests
            .lock()
            .contains(&"PUT /notifications/1/read".to_string())
    );
}

#[tokio::test]
async fn mark_read_on_an_already_read_record_still_decrements() {
    let store = spawn_store().await;
    *store.state.history_body.lock() =
        history_envelope(vec![record(1, "read"), record(2, "sent")]);
    let client = test_client(store.addr);
    client.fetch_history("tok", HistoryQuery::default()).await;
    assert_eq!(client.unread_count(), 1);

    // The counter tracks the server's accounting, not the local record:
    // it goes down (floored at zero) whenever the call succeeds.
    client.mark_read(1, "tok").await;
    assert_eq!(client.unread_count(), 0);
    client.mark_read(1, "tok").await;
    assert_eq!(client.unread_count(), 0);
}

#[tokio::test]
async fn failed_mark_read_leaves_the_cache_and_reports() {
    let store = spawn_store().await;
    *store.state.history_body.lock() = history_envelope(vec![record(1, "sent")]);
    let client = test_client(store.addr);
    client.fetch_history("tok", HistoryQuery::default()).await;

    store.state.fail_mutations.store(true, Ordering::SeqCst);
    let mut errors = event_channel(&client, EventKind::Error);
    client.mark_read(1, "tok").await;

    assert_eq!(client.history()[0].status, NotificationStatus::Sent);
    assert_eq!(client.unread_count(), 1);
    assert!(matches!(errors.try_recv().unwrap(), ClientEvent::Error(_)));
}

#[tokio::test]
async fn mark_all_read_clears_every_record_and_the_counter() {
    let store = spawn_store().await;
    *store.state.history_body.lock() = history_envelope(vec![
        record(1, "sent"),
        record(2, "pending"),
        record(3, "read"),
    ]);
    let client = test_client(store.addr);
    client.fetch_history("tok", HistoryQuery::default()).await;
    let mut updated = event_channel(&client, EventKind::NotificationsUpdated);

    client.mark_all_read("tok").await;

    assert!(
        client
            .history()
            .iter()
            .all(|r| r.status == NotificationStatus::Read)
    );
    assert_eq!(client.unread_count(), 0);
    assert!(updated.try_recv().is_ok());
}

// ─────────────────────────────────────────────────────────────────────
// Deletion
// ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_the_record_but_not_the_unread_count() {
    let store = spawn_store().await;
    *store.state.history_body.lock() =
        history_envelope(vec![record(1, "sent"), record(2, "sent")]);
    let client = test_client(store.addr);
    client.fetch_history("tok", HistoryQuery::default()).await;
    let mut updated = event_channel(&client, EventKind::NotificationsUpdated);

    client.delete_notification(1, "tok").await;

    let records = client.history();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 2);
    // Deleting an unread record does not count as reading it.
    assert_eq!(client.unread_count(), 2);
    assert!(updated.try_recv().is_ok());
    assert!(
        store
            .state
            .requests
            .lock()
            .contains(&"DELETE /notifications/1".to_string())
    );
}

#[tokio::test]
async fn failed_delete_leaves_the_cache_and_reports() {
    let store = spawn_store().await;
    *store.state.history_body.lock() = history_envelope(vec![record(1, "sent")]);
    let client = test_client(store.addr);
    client.fetch_history("tok", HistoryQuery::default()).await;

    store.state.fail_mutations.store(true, Ordering::SeqCst);
    let mut errors = event_channel(&client, EventKind::Error);
    client.delete_notification(1, "tok").await;

    assert_eq!(client.history().len(), 1);
    assert!(matches!(errors.try_recv().unwrap(), ClientEvent::Error(_)));
}

// ─────────────────────────────────────────────────────────────────────
// Unread count
// ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_unread_count_overwrites_the_local_counter() {
    let store = spawn_store().await;
    *store.state.history_body.lock() = history_envelope(vec![record(1, "sent")]);
    *store.state.unread_body.lock() = unread_envelope(7);
    let client = test_client(store.addr);
    client.fetch_history("tok", HistoryQuery::default()).await;
    assert_eq!(client.unread_count(), 1);
    let mut counts = event_channel(&client, EventKind::UnreadCount);

    let count = client.fetch_unread_count("tok").await;

    assert_eq!(count, 7);
    assert_eq!(client.unread_count(), 7);
    match counts.try_recv().unwrap() {
        ClientEvent::UnreadCount(n) => assert_eq!(n, 7),
        other => panic!("expected unread count, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_unread_count_returns_zero_and_keeps_the_counter() {
    let store = spawn_store().await;
    *store.state.history_body.lock() = history_envelope(vec![record(1, "sent")]);
    *store.state.unread_body.lock() =
        json!({"code": 500, "message": "store unavailable", "data": null});
    let client = test_client(store.addr);
    client.fetch_history("tok", HistoryQuery::default()).await;
    let mut errors = event_channel(&client, EventKind::Error);

    let count = client.fetch_unread_count("tok").await;

    assert_eq!(count, 0);
    assert_eq!(client.unread_count(), 1);
    assert!(matches!(errors.try_recv().unwrap(), ClientEvent::Error(_)));
}
