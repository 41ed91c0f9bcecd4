//! Remote document store
//!
//! Maintains a long-lived WebSocket connection to the document server.
//! Handles reconnection automatically with exponential backoff and
//! re-issues every watch after reconnecting.
//!
//! Writes are request/acknowledge pairs. Their effect is only visible
//! locally once the server pushes the next snapshot of the collection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::protocol::{
    ClientMessage, RequestId, ServerMessage, CODE_INVALID_CREDENTIALS, CODE_NOT_FOUND,
};
use super::{
    CollectionSnapshot, CollectionWatch, DocumentStore, DocumentWatch, StoreError, StoreResult,
    Watched,
};
use crate::auth::{AuthError, AuthProvider};
use crate::models::RecordId;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected, waiting to retry
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Connected and watches established
    Connected,
}

/// Configuration for the remote store connection
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// WebSocket URL of the document server
    pub url: String,
    /// Initial reconnect delay
    pub initial_reconnect_delay: Duration,
    /// Maximum reconnect delay
    pub max_reconnect_delay: Duration,
    /// How long a request waits for its acknowledgement
    pub request_timeout: Duration,
}

impl RemoteStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Why a request did not succeed
#[derive(Debug)]
enum RequestFailure {
    /// The server answered with an error
    Server { code: String, message: String },
    /// The request never got an answer
    Connection(String),
}

type Reply = std::result::Result<Option<RecordId>, RequestFailure>;

/// Commands sent to the connection task
enum Command {
    Request {
        message: ClientMessage,
        reply: oneshot::Sender<Reply>,
    },
    /// A new watch was registered; tell the server if connected
    Watch(ClientMessage),
    Shutdown,
}

type CollectionSenders = HashMap<String, watch::Sender<Watched<CollectionSnapshot>>>;
type DocumentSenders = HashMap<(String, String), watch::Sender<Watched<Option<Value>>>>;

/// State shared between the store handle and its connection task
///
/// Watches start pending and are only loaded by the server's
/// `snapshot`/`document` notifications. After a reconnect they keep the
/// last contents until the server sends fresh ones.
struct Shared {
    collections: Mutex<CollectionSenders>,
    documents: Mutex<DocumentSenders>,
    auth: watch::Sender<bool>,
    next_request: AtomicU64,
}

impl Shared {
    fn next_request_id(&self) -> RequestId {
        self.next_request.fetch_add(1, Ordering::Relaxed)
    }

    fn collections(&self) -> MutexGuard<'_, CollectionSenders> {
        self.collections.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn documents(&self) -> MutexGuard<'_, DocumentSenders> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Watch requests for everything registered so far
    fn watch_requests(&self) -> Vec<ClientMessage> {
        let mut requests: Vec<ClientMessage> = self
            .collections()
            .keys()
            .map(|collection| ClientMessage::Watch {
                request_id: self.next_request_id(),
                collection: collection.clone(),
            })
            .collect();
        requests.extend(self.documents().keys().map(|(collection, key)| {
            ClientMessage::WatchDocument {
                request_id: self.next_request_id(),
                collection: collection.clone(),
                key: key.clone(),
            }
        }));
        requests
    }
}

/// Document store backed by a remote document server
pub struct RemoteStore {
    command_tx: mpsc::Sender<Command>,
    shared: Arc<Shared>,
    status_rx: watch::Receiver<ConnectionStatus>,
    request_timeout: Duration,
    task: JoinHandle<()>,
}

impl RemoteStore {
    /// Spawn the connection task and return a handle to it
    ///
    /// Must be called from within a tokio runtime. The task keeps
    /// reconnecting until the store is dropped.
    pub fn connect(config: RemoteStoreConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let shared = Arc::new(Shared {
            collections: Mutex::new(HashMap::new()),
            documents: Mutex::new(HashMap::new()),
            auth: watch::channel(false).0,
            next_request: AtomicU64::new(1),
        });
        let request_timeout = config.request_timeout;

        let task = tokio::spawn(connection_loop(
            config,
            Arc::clone(&shared),
            command_rx,
            status_tx,
        ));

        Self {
            command_tx,
            shared,
            status_rx,
            request_timeout,
            task,
        }
    }

    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Watch connection status changes
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    async fn request(&self, build: impl FnOnce(RequestId) -> ClientMessage) -> Reply {
        let message = build(self.shared.next_request_id());
        let (reply, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::Request { message, reply })
            .await
            .map_err(|_| RequestFailure::Connection("connection task stopped".to_string()))?;

        match tokio::time::timeout(self.request_timeout, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(RequestFailure::Connection(
                "connection task stopped".to_string(),
            )),
            Err(_) => Err(RequestFailure::Connection(format!(
                "no reply within {}s",
                self.request_timeout.as_secs()
            ))),
        }
    }

    async fn write(
        &self,
        collection: &str,
        build: impl FnOnce(RequestId) -> ClientMessage,
    ) -> StoreResult<Option<RecordId>> {
        self.request(build).await.map_err(|failure| match failure {
            RequestFailure::Server { code, message } if code == CODE_NOT_FOUND => {
                StoreError::MissingDocument {
                    collection: collection.to_string(),
                    id: message,
                }
            }
            RequestFailure::Server { code, message } => {
                StoreError::rejected(collection, format!("{}: {}", code, message))
            }
            RequestFailure::Connection(reason) => StoreError::Connection(reason),
        })
    }

    async fn register_watch(&self, message: ClientMessage) -> StoreResult<()> {
        self.command_tx
            .send(Command::Watch(message))
            .await
            .map_err(|_| StoreError::Closed)
    }
}

impl Drop for RemoteStore {
    fn drop(&mut self) {
        let _ = self.command_tx.try_send(Command::Shutdown);
        self.task.abort();
    }
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn watch_collection(&self, collection: &str) -> StoreResult<CollectionWatch> {
        let (rx, is_new) = {
            let mut collections = self.shared.collections();
            match collections.get(collection) {
                Some(tx) => (tx.subscribe(), false),
                None => {
                    let (tx, rx) = watch::channel(Watched::Pending);
                    collections.insert(collection.to_string(), tx);
                    (rx, true)
                }
            }
        };

        if is_new {
            self.register_watch(ClientMessage::Watch {
                request_id: self.shared.next_request_id(),
                collection: collection.to_string(),
            })
            .await?;
        }
        Ok(rx)
    }

    async fn add(&self, collection: &str, body: Value) -> StoreResult<RecordId> {
        let id = self
            .write(collection, |request_id| ClientMessage::Add {
                request_id,
                collection: collection.to_string(),
                body,
            })
            .await?;
        id.ok_or_else(|| StoreError::rejected(collection, "server did not assign an id"))
    }

    async fn update(&self, collection: &str, id: &RecordId, body: Value) -> StoreResult<()> {
        self.write(collection, |request_id| ClientMessage::Update {
            request_id,
            collection: collection.to_string(),
            id: id.clone(),
            body,
        })
        .await
        .map(|_| ())
    }

    async fn remove(&self, collection: &str, id: &RecordId) -> StoreResult<()> {
        match self
            .write(collection, |request_id| ClientMessage::Remove {
                request_id,
                collection: collection.to_string(),
                id: id.clone(),
            })
            .await
        {
            Ok(_) | Err(StoreError::MissingDocument { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn watch_document(&self, collection: &str, key: &str) -> StoreResult<DocumentWatch> {
        let map_key = (collection.to_string(), key.to_string());
        let (rx, is_new) = {
            let mut documents = self.shared.documents();
            match documents.get(&map_key) {
                Some(tx) => (tx.subscribe(), false),
                None => {
                    let (tx, rx) = watch::channel(Watched::Pending);
                    documents.insert(map_key, tx);
                    (rx, true)
                }
            }
        };

        if is_new {
            self.register_watch(ClientMessage::WatchDocument {
                request_id: self.shared.next_request_id(),
                collection: collection.to_string(),
                key: key.to_string(),
            })
            .await?;
        }
        Ok(rx)
    }

    async fn set_document(&self, collection: &str, key: &str, body: Value) -> StoreResult<()> {
        self.write(collection, |request_id| ClientMessage::Set {
            request_id,
            collection: collection.to_string(),
            key: key.to_string(),
            body,
        })
        .await
        .map(|_| ())
    }

    fn backup_source(&self) -> &'static str {
        "cloud-backup"
    }
}

#[async_trait]
impl AuthProvider for RemoteStore {
    fn watch_state(&self) -> watch::Receiver<bool> {
        self.shared.auth.subscribe()
    }

    async fn sign_in(&self, identifier: &str, secret: &str) -> std::result::Result<(), AuthError> {
        let reply = self
            .request(|request_id| ClientMessage::SignIn {
                request_id,
                identifier: identifier.to_string(),
                secret: secret.to_string(),
            })
            .await;

        match reply {
            Ok(_) => {
                // The server also pushes `auth`; don't wait for it
                self.shared.auth.send_replace(true);
                Ok(())
            }
            Err(RequestFailure::Server { code, .. }) if code == CODE_INVALID_CREDENTIALS => {
                Err(AuthError::InvalidCredentials)
            }
            Err(RequestFailure::Server { message, .. }) => Err(AuthError::Unavailable(message)),
            Err(RequestFailure::Connection(reason)) => Err(AuthError::Unavailable(reason)),
        }
    }

    async fn sign_out(&self) -> std::result::Result<(), AuthError> {
        let reply = self
            .request(|request_id| ClientMessage::SignOut { request_id })
            .await;
        // Signed out locally even if the server never heard about it
        self.shared.auth.send_replace(false);
        match reply {
            Ok(_) => Ok(()),
            Err(RequestFailure::Server { message, .. }) => Err(AuthError::Unavailable(message)),
            Err(RequestFailure::Connection(reason)) => Err(AuthError::Unavailable(reason)),
        }
    }
}

/// Main connection loop with reconnection
async fn connection_loop(
    config: RemoteStoreConfig,
    shared: Arc<Shared>,
    mut command_rx: mpsc::Receiver<Command>,
    status_tx: watch::Sender<ConnectionStatus>,
) {
    let client_id = format!("congrega-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let mut reconnect_delay = config.initial_reconnect_delay;

    loop {
        let _ = status_tx.send(ConnectionStatus::Connecting);

        match connect_and_serve(&config, &client_id, &shared, &mut command_rx, &status_tx).await {
            Ok(true) => break,
            Ok(false) => {
                info!("Remote store connection closed, reconnecting");
                reconnect_delay = config.initial_reconnect_delay;
            }
            Err(e) => {
                warn!("Remote store connection error: {}", e);
            }
        }

        let _ = status_tx.send(ConnectionStatus::Disconnected);
        // A new connection starts signed out
        shared.auth.send_replace(false);

        // Wait before reconnecting, but keep answering commands
        let sleep = tokio::time::sleep(reconnect_delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => {
                    reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay);
                    break;
                }
                cmd = command_rx.recv() => match cmd {
                    Some(Command::Request { reply, .. }) => {
                        let _ = reply.send(Err(RequestFailure::Connection(
                            "not connected to the document server".to_string(),
                        )));
                    }
                    // Re-issued from the shared registry after reconnecting
                    Some(Command::Watch(_)) => {}
                    Some(Command::Shutdown) | None => {
                        let _ = status_tx.send(ConnectionStatus::Disconnected);
                        return;
                    }
                },
            }
        }
    }

    let _ = status_tx.send(ConnectionStatus::Disconnected);
}

/// Connect and serve until disconnection (`Ok(false)`) or shutdown (`Ok(true)`)
async fn connect_and_serve(
    config: &RemoteStoreConfig,
    client_id: &str,
    shared: &Arc<Shared>,
    command_rx: &mut mpsc::Receiver<Command>,
    status_tx: &watch::Sender<ConnectionStatus>,
) -> Result<bool> {
    debug!("Connecting to {}", config.url);
    let (ws_stream, _) = connect_async(&config.url).await?;
    let (mut write, mut read) = ws_stream.split();

    send(&mut write, &ClientMessage::hello(client_id)).await?;
    let server_id = wait_for_welcome(&mut read).await?;
    info!("Connected to document server {}", server_id);

    for request in shared.watch_requests() {
        send(&mut write, &request).await?;
    }
    let _ = status_tx.send(ConnectionStatus::Connected);

    let mut pending: HashMap<RequestId, oneshot::Sender<Reply>> = HashMap::new();

    let result = loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(Command::Request { message, reply }) => {
                    if let Err(e) = send(&mut write, &message).await {
                        let _ = reply.send(Err(RequestFailure::Connection(e.to_string())));
                        break Err(e);
                    }
                    if let Some(id) = message.request_id() {
                        pending.insert(id, reply);
                    }
                }
                Some(Command::Watch(message)) => {
                    if let Err(e) = send(&mut write, &message).await {
                        break Err(e);
                    }
                }
                Some(Command::Shutdown) | None => {
                    write.close().await.ok();
                    break Ok(true);
                }
            },

            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => match ServerMessage::decode(&text) {
                    Ok(message) => handle_server_message(message, shared, &mut pending),
                    Err(e) => warn!("Ignoring undecodable server message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => break Ok(false),
                Some(Err(e)) => break Err(e.into()),
                _ => {}
            },
        }
    };

    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(RequestFailure::Connection(
            "connection lost before the server replied".to_string(),
        )));
    }

    result
}

/// Apply one server message to shared state or a pending request
fn handle_server_message(
    message: ServerMessage,
    shared: &Shared,
    pending: &mut HashMap<RequestId, oneshot::Sender<Reply>>,
) {
    match message {
        ServerMessage::Snapshot {
            collection,
            documents,
        } => {
            debug!(%collection, count = documents.len(), "snapshot received");
            if let Some(tx) = shared.collections().get(&collection) {
                tx.send_replace(Watched::Loaded(documents));
            }
        }
        ServerMessage::Document {
            collection,
            key,
            body,
        } => {
            if let Some(tx) = shared.documents().get(&(collection, key)) {
                tx.send_replace(Watched::Loaded(body));
            }
        }
        ServerMessage::Ack { request_id, id } => {
            if let Some(reply) = pending.remove(&request_id) {
                let _ = reply.send(Ok(id));
            }
        }
        ServerMessage::Error {
            request_id: Some(request_id),
            code,
            message,
        } => {
            if let Some(reply) = pending.remove(&request_id) {
                let _ = reply.send(Err(RequestFailure::Server { code, message }));
            }
        }
        ServerMessage::Error {
            request_id: None,
            code,
            message,
        } => {
            warn!("Document server error {}: {}", code, message);
        }
        ServerMessage::Auth { signed_in } => {
            shared.auth.send_replace(signed_in);
        }
        ServerMessage::Welcome { .. } => {}
    }
}

async fn send(write: &mut SplitSink<Socket, Message>, message: &ClientMessage) -> Result<()> {
    write.send(Message::Text(message.encode()?)).await?;
    Ok(())
}

/// Wait for the handshake reply
async fn wait_for_welcome(read: &mut SplitStream<Socket>) -> Result<String> {
    let timeout = Duration::from_secs(10);
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            anyhow::bail!("Timeout waiting for document server. Check that the server is running.");
        }

        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match ServerMessage::decode(&text) {
                            Ok(ServerMessage::Welcome { server_id }) => return Ok(server_id),
                            Ok(ServerMessage::Error { message, .. }) => {
                                anyhow::bail!("Document server refused connection: {}", message);
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        anyhow::bail!("Document server closed connection during handshake");
                    }
                    Some(Err(e)) => {
                        anyhow::bail!("Document server connection error: {}", e);
                    }
                    _ => {}
                }
            }
            _ = tokio::time::sleep(remaining) => {
                anyhow::bail!("Timeout waiting for document server. Check that the server is running.");
            }
        }
    }
}
