//! HTTP API 集成测试

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use serde_json::{Value, json};
use shared::document::{Collection, FieldValue, Snapshot, WriteBatch};
use sync_server::api::build_app;
use sync_server::{Config, DocumentStore, ServerState};
use tower::ServiceExt;

fn test_state() -> ServerState {
    ServerState::with_store(Config::with_overrides(0, None), DocumentStore::new(16))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn batch_request(batch: &WriteBatch) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/batch")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(batch).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_collection_sizes() {
    let state = test_state();
    let mut batch = WriteBatch::new();
    batch.set_merge(Collection::Checks, "check-1", [("checkNumber", FieldValue::set(1))]);
    state.store.commit(batch).await.unwrap();

    let response = build_app(state)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["collections"]["checks"], 1);
    assert_eq!(body["collections"]["tables"], 0);
}

#[tokio::test]
async fn commit_then_read_snapshot() {
    let state = test_state();
    let app = build_app(state);

    let mut batch = WriteBatch::new();
    batch
        .set_merge(Collection::Tables, "table-12", [("tableNumber", FieldValue::set(12))])
        .set_merge(Collection::Tables, "table-3", [("tableNumber", FieldValue::set(3))])
        .set_merge(
            Collection::Checks,
            "check-7",
            [
                ("checkNumber", FieldValue::set(7)),
                ("tableId", FieldValue::set("table-3")),
                ("updatedAt", FieldValue::ServerTimestamp),
            ],
        );

    let response = app.clone().oneshot(batch_request(&batch)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["versions"]["tables"], 1);

    let response = app
        .oneshot(
            Request::get("/api/collections/tables")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let snapshot: Snapshot = serde_json::from_value(body_json(response).await).unwrap();
    let numbers: Vec<u64> = snapshot
        .documents
        .iter()
        .filter_map(|d| d.order_key(Collection::Tables))
        .collect();
    assert_eq!(numbers, vec![3, 12]);
}

#[tokio::test]
async fn empty_batch_is_bad_request() {
    let app = build_app(test_state());
    let response = app
        .oneshot(batch_request(&WriteBatch::new()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], 7402);
}

#[tokio::test]
async fn unknown_collection_is_rejected() {
    let app = build_app(test_state());
    let response = app
        .oneshot(
            Request::get("/api/collections/orders")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], 7401);
}

#[tokio::test]
async fn listen_streams_initial_snapshot_then_changes() {
    let state = test_state();
    let store = state.store.clone();
    let app = build_app(state);

    let response = app
        .oneshot(
            Request::get("/api/collections/checks/listen")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let mut body = response.into_body().into_data_stream();
    let first = String::from_utf8(body.next().await.unwrap().unwrap().to_vec()).unwrap();
    assert!(first.contains("event: snapshot"));
    assert!(first.contains("\"version\":0"));

    let mut batch = WriteBatch::new();
    batch.set_merge(Collection::Checks, "check-4", [("checkNumber", FieldValue::set(4))]);
    store.commit(batch).await.unwrap();

    let second = String::from_utf8(body.next().await.unwrap().unwrap().to_vec()).unwrap();
    assert!(second.contains("event: snapshot"));
    assert!(second.contains("check-4"));
    let data = second
        .lines()
        .find_map(|l| l.strip_prefix("data: "))
        .unwrap();
    let snapshot: Snapshot = serde_json::from_str(data).unwrap();
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.documents[0].fields["checkNumber"], json!(4));
}
