//! End-to-end tests for the webhook intake and event readback routes,
//! driving the router directly with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use hookline::record::{EventKind, EventRecord};
use hookline::server::{AppState, router};
use hookline::store::{EventStore, MemoryStore};

fn app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(16));
    let router = router(AppState {
        store: store.clone(),
    });
    (router, store)
}

fn webhook_request(event_kind: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("x-github-event", event_kind)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn push_delivery_is_normalized_and_stored() {
    let (app, store) = app();
    let payload = json!({
        "ref": "refs/heads/main",
        "pusher": { "name": "alice" },
        "head_commit": { "timestamp": "2024-03-01T12:30:00Z" }
    });

    let response = app.oneshot(webhook_request("push", &payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["stored"], json!(true));

    let records = store.latest(1).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, EventKind::Push);
    assert_eq!(records[0].author, "alice");
    assert_eq!(records[0].to_branch, "main");
    assert_eq!(records[0].from_branch, None);
}

#[tokio::test]
async fn merged_pull_request_is_stored_as_merge() {
    let (app, store) = app();
    let payload = json!({
        "action": "closed",
        "pull_request": {
            "user": { "login": "bob" },
            "head": { "ref": "feature/login" },
            "base": { "ref": "main" },
            "merged": true,
            "merged_at": "2024-03-02T17:45:00Z"
        }
    });

    let response = app
        .oneshot(webhook_request("pull_request", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = store.latest(1).await.unwrap();
    assert_eq!(records[0].kind, EventKind::Merge);
    assert_eq!(records[0].from_branch.as_deref(), Some("feature/login"));
    assert_eq!(records[0].to_branch, "main");
}

#[tokio::test]
async fn closed_unmerged_pull_request_stores_nothing() {
    let (app, store) = app();
    let payload = json!({
        "action": "closed",
        "pull_request": { "user": { "login": "bob" }, "merged": false }
    });

    let response = app
        .oneshot(webhook_request("pull_request", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["stored"], json!(false));
    assert!(store.latest(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn ping_is_acknowledged_without_storing() {
    let (app, store) = app();
    let payload = json!({ "zen": "Non-blocking is better than blocking." });

    let response = app.oneshot(webhook_request("ping", &payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["message"], json!("pong"));
    assert_eq!(body["stored"], json!(false));
    assert!(store.latest(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn undecodable_body_is_a_bad_request() {
    let (app, store) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("x-github-event", "push")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json at all"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.latest(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_object_json_body_is_a_bad_request() {
    let (app, _store) = app();
    let response = app
        .oneshot(webhook_request("push", &json!(["not", "an", "object"])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn events_endpoint_returns_newest_first() {
    let (app, store) = app();

    for author in ["alice", "bob", "carol"] {
        let payload = json!({
            "ref": "refs/heads/main",
            "pusher": { "name": author }
        });
        store
            .insert(expect_record(&payload))
            .await
            .unwrap();
    }

    let request = Request::builder()
        .uri("/events?limit=2")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records: Vec<EventRecord> =
        serde_json::from_value(json_body(response).await).unwrap();
    let authors: Vec<_> = records.iter().map(|r| r.author.as_str()).collect();
    assert_eq!(authors, vec!["carol", "bob"]);
}

#[tokio::test]
async fn events_endpoint_defaults_to_latest_single_record() {
    let (app, store) = app();
    for author in ["alice", "bob"] {
        let payload = json!({ "ref": "refs/heads/main", "pusher": { "name": author } });
        store.insert(expect_record(&payload)).await.unwrap();
    }

    let request = Request::builder()
        .uri("/events")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let records: Vec<EventRecord> =
        serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].author, "bob");
}

#[tokio::test]
async fn health_endpoint_reports_service() {
    let (app, _store) = app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], json!("healthy"));
}

fn expect_record(payload: &Value) -> EventRecord {
    match hookline::normalize::normalize("push", payload).unwrap() {
        hookline::normalize::Outcome::Event(record) => record,
        other => panic!("expected an event record, got {other:?}"),
    }
}
