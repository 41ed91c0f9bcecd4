//! Test doubles for the store layer
//!
//! - [`RecordingStore`]: records every write and fails on demand
//! - [`FakeServer`]: a loopback document server for [`super::RemoteStore`]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::{
    CollectionWatch, DocumentStore, DocumentWatch, LocalStore, StoreError, StoreResult,
};
use crate::backup::Backup;
use crate::models::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOp {
    Add,
    Update,
    Remove,
    Set,
}

/// A write as seen by the store
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Add { collection: String, body: Value },
    Update { collection: String, id: RecordId, body: Value },
    Remove { collection: String, id: RecordId },
    Set { collection: String, key: String, body: Value },
}

/// [`LocalStore`] that logs writes and can be told to reject some of them
#[derive(Default)]
pub struct RecordingStore {
    pub inner: LocalStore,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<(WriteOp, String)>>,
    no_restore: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every `op` on `collection` from now on
    pub fn fail_on(&self, op: WriteOp, collection: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert((op, collection.to_string()));
    }

    /// Behave like a deployment that cannot restore backups
    pub fn disable_restore(&self) {
        self.no_restore.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, op: WriteOp, collection: &str, call: Call) -> StoreResult<()> {
        self.calls.lock().unwrap().push(call);
        if self
            .failing
            .lock()
            .unwrap()
            .contains(&(op, collection.to_string()))
        {
            return Err(StoreError::rejected(collection, "permission-denied"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn watch_collection(&self, collection: &str) -> StoreResult<CollectionWatch> {
        self.inner.watch_collection(collection).await
    }

    async fn add(&self, collection: &str, body: Value) -> StoreResult<RecordId> {
        let call = Call::Add {
            collection: collection.to_string(),
            body: body.clone(),
        };
        self.record(WriteOp::Add, collection, call)?;
        self.inner.add(collection, body).await
    }

    async fn update(&self, collection: &str, id: &RecordId, body: Value) -> StoreResult<()> {
        let call = Call::Update {
            collection: collection.to_string(),
            id: id.clone(),
            body: body.clone(),
        };
        self.record(WriteOp::Update, collection, call)?;
        self.inner.update(collection, id, body).await
    }

    async fn remove(&self, collection: &str, id: &RecordId) -> StoreResult<()> {
        let call = Call::Remove {
            collection: collection.to_string(),
            id: id.clone(),
        };
        self.record(WriteOp::Remove, collection, call)?;
        self.inner.remove(collection, id).await
    }

    async fn watch_document(&self, collection: &str, key: &str) -> StoreResult<DocumentWatch> {
        self.inner.watch_document(collection, key).await
    }

    async fn set_document(&self, collection: &str, key: &str, body: Value) -> StoreResult<()> {
        let call = Call::Set {
            collection: collection.to_string(),
            key: key.to_string(),
            body: body.clone(),
        };
        self.record(WriteOp::Set, collection, call)?;
        self.inner.set_document(collection, key, body).await
    }

    fn backup_source(&self) -> &'static str {
        self.inner.backup_source()
    }

    fn supports_restore(&self) -> bool {
        !self.no_restore.load(Ordering::SeqCst) && self.inner.supports_restore()
    }

    async fn restore(&self, backup: &Backup) -> StoreResult<()> {
        self.inner.restore(backup).await
    }

    async fn reset(&self) -> StoreResult<()> {
        self.inner.reset().await
    }
}

/// Document server listening on a loopback port
pub struct FakeServer {
    listener: TcpListener,
    pub url: String,
}

impl FakeServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        Self { listener, url }
    }

    /// Accept the next client and answer its `hello`
    pub async fn accept(&self) -> ServerConnection {
        let (stream, _) = self.listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut conn = ServerConnection { ws };

        let hello = conn.next().await.unwrap();
        assert_eq!(hello["type"], "hello");
        conn.push(json!({"type": "welcome", "serverId": "fake"}))
            .await;
        conn
    }
}

/// Server side of one client connection
pub struct ServerConnection {
    ws: WebSocketStream<TcpStream>,
}

impl ServerConnection {
    /// Next client message; `None` once the client is gone
    pub async fn next(&mut self) -> Option<Value> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return serde_json::from_str(&text).ok(),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }

    /// Skip client messages until one of type `kind` arrives
    pub async fn next_of(&mut self, kind: &str) -> Option<Value> {
        loop {
            let message = self.next().await?;
            if message["type"] == kind {
                return Some(message);
            }
        }
    }

    pub async fn push(&mut self, message: Value) {
        self.ws
            .send(Message::Text(message.to_string()))
            .await
            .unwrap();
    }

    /// Answer a request with `ack`
    pub async fn ack(&mut self, request: &Value, id: Option<&str>) {
        self.push(json!({
            "type": "ack",
            "requestId": request["requestId"],
            "id": id,
        }))
        .await;
    }

    pub async fn snapshot(&mut self, collection: &str, documents: Value) {
        self.push(json!({
            "type": "snapshot",
            "collection": collection,
            "documents": documents,
        }))
        .await;
    }

    /// Drop the connection from the server side
    pub async fn close(mut self) {
        self.ws.close(None).await.ok();
    }
}
