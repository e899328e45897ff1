//! HTTP + SSE 网络实现

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::document::{
    Collection, CommitResult, FeedEvent, SSE_EVENT_ERROR, SSE_EVENT_SNAPSHOT, Snapshot, WriteBatch,
};
use shared::error::{ApiResponse, ErrorCode};

use crate::remote::{FeedSender, FeedSubscription, RemoteStore};
use crate::sse::{SseDecoder, SseMessage};
use crate::{ClientConfig, ClientError, ClientResult};

/// 网络文档存储客户端
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    config: ClientConfig,
}

impl HttpRemoteStore {
    /// Create a new client from configuration
    ///
    /// 不设置整体超时 (SSE 连接长期存活)，提交请求单独设置超时
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        self.config.base()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base(), path)
    }

    /// GET /api/collections/{collection}
    pub async fn fetch(&self, collection: Collection) -> ClientResult<Snapshot> {
        let response = self
            .client
            .get(self.url(&format!("/api/collections/{}", collection)))
            .timeout(self.config.timeout)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let response = Self::check_status(response).await?;
        response.json().await.map_err(Into::into)
    }

    /// 非 2xx 状态映射为 [`ClientError::Api`]
    async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await?;
        let (code, message) = match serde_json::from_str::<ApiResponse<()>>(&text) {
            Ok(body) => (
                body.code
                    .and_then(|c| ErrorCode::try_from(c).ok())
                    .unwrap_or(ErrorCode::Unknown),
                body.message,
            ),
            Err(_) => {
                let code = match status {
                    StatusCode::NOT_FOUND => ErrorCode::NotFound,
                    StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                        ErrorCode::InvalidRequest
                    }
                    StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                        ErrorCode::NetworkError
                    }
                    _ => ErrorCode::InternalError,
                };
                let message = if text.is_empty() {
                    status.to_string()
                } else {
                    text
                };
                (code, message)
            }
        };
        Err(ClientError::Api { code, message })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn commit(&self, batch: WriteBatch) -> ClientResult<CommitResult> {
        let response = self
            .client
            .post(self.url("/api/batch"))
            .timeout(self.config.timeout)
            .json(&batch)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn listen(&self, collection: Collection) -> ClientResult<FeedSubscription> {
        let response = self
            .client
            .get(self.url(&format!("/api/collections/{}/listen", collection)))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let (tx, subscription) = FeedSubscription::channel(collection, self.config.feed_buffer);
        tokio::spawn(async move {
            tokio::select! {
                _ = tx.cancelled() => {
                    tracing::debug!(collection = %collection, "Listener cancelled");
                }
                _ = pump_events(response, &tx) => {}
            }
        });
        Ok(subscription)
    }
}

/// 读取 SSE 流并转换为 [`FeedEvent`]，直到出错或结束
async fn pump_events(response: reqwest::Response, tx: &FeedSender) {
    let collection = tx.collection();
    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(collection = %collection, error = %e, "Listener stream failed");
                tx.fail(e.to_string()).await;
                return;
            }
        };
        for message in decoder.push(&chunk) {
            match decode_message(message) {
                Ok(Some(event)) => {
                    let terminal = matches!(event, FeedEvent::Error(_));
                    if !tx.send(event).await || terminal {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tx.fail(e.to_string()).await;
                    return;
                }
            }
        }
    }

    tracing::warn!(collection = %collection, "Listener stream closed by server");
    tx.fail("stream closed by server").await;
}

fn decode_message(message: SseMessage) -> ClientResult<Option<FeedEvent>> {
    match message.event.as_deref() {
        Some(SSE_EVENT_SNAPSHOT) => {
            let snapshot: Snapshot = serde_json::from_str(&message.data)?;
            Ok(Some(FeedEvent::Snapshot(snapshot)))
        }
        Some(SSE_EVENT_ERROR) => Ok(Some(FeedEvent::Error(message.data))),
        other => {
            tracing::debug!(event = ?other, "Ignoring unknown SSE event");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_event() {
        let event = decode_message(SseMessage {
            event: Some("error".into()),
            data: "checks: storage offline".into(),
        })
        .unwrap();
        assert_eq!(
            event,
            Some(FeedEvent::Error("checks: storage offline".into()))
        );
    }

    #[test]
    fn test_decode_bad_snapshot() {
        let result = decode_message(SseMessage {
            event: Some("snapshot".into()),
            data: "{".into(),
        });
        assert!(matches!(result, Err(ClientError::Serialization(_))));
    }

    #[test]
    fn test_unknown_event_ignored() {
        let event = decode_message(SseMessage {
            event: None,
            data: "hello".into(),
        })
        .unwrap();
        assert_eq!(event, None);
    }
}
