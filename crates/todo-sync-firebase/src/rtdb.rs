//! Realtime database client over the REST API.

use std::sync::{Arc, Mutex};

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde_json::Value;
use todo_sync_core::{PushKeyGenerator, Snapshot, TaskId};
use tracing::{debug, info, warn};

use crate::config::{FirebaseConfig, validate_segment};
use crate::error::FirebaseError;
use crate::sse::{SseEvent, sse_events};
use crate::tree::{RemoteTree, StreamPayload};

/// Full-snapshot stream produced by [`RtdbStore::subscribe`].
pub type SnapshotStream = BoxStream<'static, Result<Snapshot, FirebaseError>>;

/// Client for one collection of a realtime database.
#[derive(Clone)]
pub struct RtdbStore {
    client: Client,
    collection_url: String,
    auth_token: Option<String>,
    keys: Arc<Mutex<PushKeyGenerator>>,
}

impl RtdbStore {
    /// Build a client with its own connection pool.
    ///
    /// # Errors
    /// Returns an error when the configuration is incomplete.
    pub fn new(config: &FirebaseConfig) -> Result<Self, FirebaseError> {
        Self::with_client(Client::new(), config)
    }

    /// Build a client on a shared HTTP client.
    ///
    /// # Errors
    /// Returns an error when the configuration is incomplete.
    pub fn with_client(client: Client, config: &FirebaseConfig) -> Result<Self, FirebaseError> {
        config.validate()?;
        Ok(Self {
            client,
            collection_url: config.collection_url(),
            auth_token: None,
            keys: Arc::new(Mutex::new(PushKeyGenerator::new())),
        })
    }

    /// Authenticate every request with a user's ID token.
    #[must_use]
    pub fn with_auth(mut self, id_token: impl Into<String>) -> Self {
        self.auth_token = Some(id_token.into());
        self
    }

    /// Generate a push key locally, the way the database SDKs do.
    #[must_use]
    pub fn push_key(&self) -> Option<TaskId> {
        self.keys.lock().ok().map(|mut generator| generator.next_key())
    }

    fn url(&self, segments: &[&str]) -> Result<String, FirebaseError> {
        let mut url = self.collection_url.clone();
        for segment in segments {
            validate_segment(segment)?;
            url.push('/');
            url.push_str(segment);
        }
        url.push_str(".json");
        Ok(url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.query(&[("auth", token.as_str())]),
            None => builder,
        }
    }

    async fn send_write(&self, builder: RequestBuilder) -> Result<(), FirebaseError> {
        let response = builder.query(&[("print", "silent")]).send().await?;
        ensure_success(response).await.map(|_| ())
    }

    /// Overwrite the record at `key`.
    ///
    /// # Errors
    /// Returns an error for invalid keys, transport failures, or rejected writes.
    pub async fn set(&self, key: &str, value: &Value) -> Result<(), FirebaseError> {
        let url = self.url(&[key])?;
        self.send_write(self.request(Method::PUT, &url).json(value)).await?;
        info!(%key, "Wrote record");
        Ok(())
    }

    /// Overwrite a single field of the record at `key`.
    ///
    /// # Errors
    /// Returns an error for invalid keys, transport failures, or rejected writes.
    pub async fn set_field(&self, key: &str, field: &str, value: &Value) -> Result<(), FirebaseError> {
        let url = self.url(&[key, field])?;
        self.send_write(self.request(Method::PUT, &url).json(value)).await?;
        info!(%key, %field, "Wrote field");
        Ok(())
    }

    /// Remove the record at `key`.
    ///
    /// # Errors
    /// Returns an error for invalid keys, transport failures, or rejected deletes.
    pub async fn remove(&self, key: &str) -> Result<(), FirebaseError> {
        let url = self.url(&[key])?;
        self.send_write(self.request(Method::DELETE, &url)).await?;
        info!(%key, "Removed record");
        Ok(())
    }

    /// Read the collection once.
    ///
    /// # Errors
    /// Returns an error for transport failures, rejected reads, or malformed JSON.
    pub async fn fetch(&self) -> Result<Snapshot, FirebaseError> {
        let url = self.url(&[])?;
        let response = ensure_success(self.request(Method::GET, &url).send().await?).await?;
        let root: Value = response.json().await?;
        Ok(Snapshot::from_value(&root))
    }

    /// Listen to the collection.
    ///
    /// The stream yields a full snapshot after every `put` or `patch` event.
    /// A `cancel` or `auth_revoked` event is yielded as an error and ends the
    /// stream. Dropping the stream closes the connection.
    ///
    /// # Errors
    /// Returns an error when the listener cannot be established.
    pub async fn subscribe(&self) -> Result<SnapshotStream, FirebaseError> {
        let url = self.url(&[])?;
        let response = self
            .request(Method::GET, &url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = ensure_success(response).await?;
        info!(url = %self.collection_url, "Listening for changes");
        Ok(snapshot_stream(sse_events(Box::pin(response.bytes_stream()))).boxed())
    }
}

/// Fold stream events into a tree and emit a snapshot after each change.
pub fn snapshot_stream<E>(events: E) -> impl Stream<Item = Result<Snapshot, FirebaseError>> + Send
where
    E: Stream<Item = Result<SseEvent, FirebaseError>> + Send + 'static,
{
    futures::stream::unfold(
        (Box::pin(events), RemoteTree::new(), false),
        |(mut events, mut tree, done)| async move {
            if done {
                return None;
            }
            loop {
                let event = match events.next().await {
                    Some(Ok(event)) => event,
                    Some(Err(err)) => return Some((Err(err), (events, tree, true))),
                    None => return None,
                };
                match event.event.as_str() {
                    "put" | "patch" => {
                        let payload: StreamPayload = match serde_json::from_str(&event.data) {
                            Ok(payload) => payload,
                            Err(err) => {
                                warn!(event = %event.event, "Malformed stream payload: {err}");
                                return Some((Err(FirebaseError::Json(err)), (events, tree, false)));
                            }
                        };
                        debug!(event = %event.event, path = %payload.path, "Applying change");
                        if event.event == "put" {
                            tree.put(&payload.path, payload.data);
                        } else {
                            tree.patch(&payload.path, payload.data);
                        }
                        let snapshot = Snapshot::from_value(tree.root());
                        return Some((Ok(snapshot), (events, tree, false)));
                    }
                    "keep-alive" => {}
                    "cancel" => {
                        return Some((Err(FirebaseError::Cancelled(event.data)), (events, tree, true)));
                    }
                    "auth_revoked" => {
                        return Some((Err(FirebaseError::AuthRevoked), (events, tree, true)));
                    }
                    other => debug!(event = %other, "Ignoring unknown stream event"),
                }
            }
        },
    )
}

async fn ensure_success(response: Response) -> Result<Response, FirebaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(FirebaseError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Extract `{"error": "..."}` from a database error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name: &str, data: &str) -> Result<SseEvent, FirebaseError> {
        Ok(SseEvent {
            event: name.to_owned(),
            data: data.to_owned(),
        })
    }

    async fn collect(events: Vec<Result<SseEvent, FirebaseError>>) -> Vec<Result<Snapshot, FirebaseError>> {
        snapshot_stream(futures::stream::iter(events)).collect().await
    }

    #[tokio::test]
    async fn put_and_patch_produce_full_snapshots() {
        let out = collect(vec![
            event("put", r#"{"path":"/","data":{"a":{"title":"x","completed":false}}}"#),
            event("keep-alive", "null"),
            event("patch", r#"{"path":"/a","data":{"completed":true}}"#),
            event("put", r#"{"path":"/b","data":{"title":"y"}}"#),
        ])
        .await;

        assert_eq!(out.len(), 3);
        let last = out
            .last()
            .and_then(|item| item.as_ref().ok())
            .unwrap_or_else(|| panic!("expected snapshot"));
        assert_eq!(last.get("a"), Some(&json!({"title": "x", "completed": true})));
        assert_eq!(last.get("b"), Some(&json!({"title": "y"})));
    }

    #[tokio::test]
    async fn cancel_ends_the_stream_with_an_error() {
        let out = collect(vec![
            event("put", r#"{"path":"/","data":null}"#),
            event("cancel", "Permission denied"),
            event("put", r#"{"path":"/a","data":{"title":"never"}}"#),
        ])
        .await;

        assert_eq!(out.len(), 2);
        assert!(matches!(&out[1], Err(FirebaseError::Cancelled(reason)) if reason == "Permission denied"));
    }

    #[tokio::test]
    async fn auth_revoked_ends_the_stream() {
        let out = collect(vec![event("auth_revoked", "credential is no longer valid")]).await;
        assert!(matches!(out.as_slice(), [Err(FirebaseError::AuthRevoked)]));
    }

    #[tokio::test]
    async fn malformed_payload_is_reported_and_listening_continues() {
        let out = collect(vec![
            event("put", "not json"),
            event("put", r#"{"path":"/","data":{"a":{}}}"#),
        ])
        .await;
        assert!(matches!(out[0], Err(FirebaseError::Json(_))));
        assert!(out[1].is_ok());
    }

    #[test]
    fn error_message_prefers_json_error_field() {
        assert_eq!(error_message(r#"{"error":"Permission denied"}"#), "Permission denied");
        assert_eq!(error_message(" plain text \n"), "plain text");
    }
}
