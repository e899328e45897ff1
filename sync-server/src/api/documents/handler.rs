//! Document API Handlers

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use shared::document::{
    Collection, CommitResult, SSE_EVENT_ERROR, SSE_EVENT_SNAPSHOT, Snapshot, WriteBatch,
};
use shared::error::{AppError, AppResult};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::core::ServerState;
use crate::store::DocumentStore;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

fn parse_collection(name: &str) -> AppResult<Collection> {
    name.parse()
        .map_err(|_| AppError::unknown_collection(name))
}

/// GET /api/collections/{collection} - 当前有序快照
pub async fn snapshot(
    State(state): State<ServerState>,
    Path(collection): Path<String>,
) -> AppResult<Json<Snapshot>> {
    let collection = parse_collection(&collection)?;
    Ok(Json(state.store.snapshot(collection)))
}

/// POST /api/batch - 原子提交
pub async fn commit(
    State(state): State<ServerState>,
    Json(batch): Json<WriteBatch>,
) -> AppResult<Json<CommitResult>> {
    let writes = batch.len();
    let result = state.store.commit(batch).await?;
    tracing::info!(
        writes,
        commit_time = %result.commit_time,
        "Batch committed via API"
    );
    Ok(Json(result))
}

/// GET /api/collections/{collection}/listen - SSE 快照流
///
/// 先推送当前快照，之后每次提交推送一次完整快照。
/// 订阅者落后时直接推送最新快照，不补发中间版本。
pub async fn listen(
    State(state): State<ServerState>,
    Path(collection): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let collection = parse_collection(&collection)?;
    let (initial, rx) = state.store.subscribe(collection);
    tracing::debug!(
        collection = %collection,
        subscribers = state.store.subscriber_count(collection),
        "Listener attached"
    );

    let stream = snapshot_stream(state.store.clone(), collection, initial, rx);
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

struct FeedCursor {
    store: DocumentStore,
    collection: Collection,
    pending: Option<Snapshot>,
    last_version: Option<u64>,
    rx: broadcast::Receiver<Snapshot>,
    done: bool,
}

fn snapshot_stream(
    store: DocumentStore,
    collection: Collection,
    initial: Snapshot,
    rx: broadcast::Receiver<Snapshot>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let cursor = FeedCursor {
        store,
        collection,
        pending: Some(initial),
        last_version: None,
        rx,
        done: false,
    };

    futures::stream::unfold(cursor, |mut cursor| async move {
        if cursor.done {
            return None;
        }
        loop {
            let next = match cursor.pending.take() {
                Some(snapshot) => snapshot,
                None => match cursor.rx.recv().await {
                    Ok(snapshot) => snapshot,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            collection = %cursor.collection,
                            skipped,
                            "Listener lagged, sending latest snapshot"
                        );
                        cursor.store.snapshot(cursor.collection)
                    }
                    Err(RecvError::Closed) => return None,
                },
            };

            // 跳过已推送过的版本 (落后补发后可能重复)
            if cursor.last_version.is_some_and(|v| next.version <= v) {
                continue;
            }
            cursor.last_version = Some(next.version);

            let event = match Event::default().event(SSE_EVENT_SNAPSHOT).json_data(&next) {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(collection = %cursor.collection, error = %e, "Failed to encode snapshot");
                    cursor.done = true;
                    Event::default()
                        .event(SSE_EVENT_ERROR)
                        .data(format!("{}: {}", cursor.collection, e))
                }
            };
            return Some((Ok(event), cursor));
        }
    })
}
