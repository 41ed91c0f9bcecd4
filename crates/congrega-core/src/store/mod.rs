//! Document store collaborators
//!
//! A document store holds named collections of JSON documents plus a few
//! singleton documents, and pushes the full contents of a collection to
//! watchers whenever anything in it changes.
//!
//! ## Backends
//!
//! - [`LocalStore`]: in-memory collections persisted to one JSON file.
//!   Supports restoring a backup and resetting all data.
//! - [`RemoteStore`]: a long-lived WebSocket connection to a document
//!   server. Writes are acknowledged by the server; changes arrive as
//!   snapshot notifications, including the echo of our own writes.
//!
//! Watches use `tokio::sync::watch`: a receiver always holds the latest
//! snapshot and intermediate snapshots may be coalesced. Dropping the
//! receiver releases the watch. A watch stays [`Watched::Pending`] until
//! the store has reported the contents at least once.

mod error;
mod local;
mod protocol;
mod remote;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::backup::Backup;
use crate::models::RecordId;

pub use error::{StoreError, StoreResult};
pub use local::LocalStore;
pub use remote::{ConnectionStatus, RemoteStore, RemoteStoreConfig};

/// A document as held by the store: identity plus JSON body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: RecordId,
    pub body: Value,
}

impl StoredDocument {
    pub fn new(id: RecordId, body: Value) -> Self {
        Self { id, body }
    }
}

/// Full contents of one collection
pub type CollectionSnapshot = Vec<StoredDocument>;

/// Latest value held by a watch
#[derive(Debug, Clone, PartialEq)]
pub enum Watched<T> {
    /// The store has not reported the contents yet
    Pending,
    Loaded(T),
}

impl<T> Watched<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Watched::Loaded(value) => Some(value),
            Watched::Pending => None,
        }
    }

    pub fn loaded_mut(&mut self) -> Option<&mut T> {
        match self {
            Watched::Loaded(value) => Some(value),
            Watched::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Watched::Pending)
    }
}

/// Receiver side of a collection watch
pub type CollectionWatch = watch::Receiver<Watched<CollectionSnapshot>>;

/// Receiver side of a singleton document watch; loaded `None` while absent
pub type DocumentWatch = watch::Receiver<Watched<Option<Value>>>;

/// Capability offered by a document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Watch a collection
    ///
    /// The receiver holds the current contents as soon as the store knows
    /// them (an empty list for an empty or unknown collection).
    async fn watch_collection(&self, collection: &str) -> StoreResult<CollectionWatch>;

    /// Create a document; the store assigns its identity
    async fn add(&self, collection: &str, body: Value) -> StoreResult<RecordId>;

    /// Overwrite the body of an existing document
    async fn update(&self, collection: &str, id: &RecordId, body: Value) -> StoreResult<()>;

    /// Delete a document; deleting a missing document succeeds
    async fn remove(&self, collection: &str, id: &RecordId) -> StoreResult<()>;

    /// Watch a singleton document
    async fn watch_document(&self, collection: &str, key: &str) -> StoreResult<DocumentWatch>;

    /// Create or fully overwrite a singleton document
    async fn set_document(&self, collection: &str, key: &str, body: Value) -> StoreResult<()>;

    /// Tag written into backups taken from this store
    fn backup_source(&self) -> &'static str;

    /// Whether [`DocumentStore::restore`] is available
    fn supports_restore(&self) -> bool {
        false
    }

    /// Replace all data with the contents of a backup
    async fn restore(&self, _backup: &Backup) -> StoreResult<()> {
        Err(StoreError::Unsupported(
            "A importação direta não está disponível na versão em nuvem por segurança. Restaure backups pelo console do servidor.",
        ))
    }

    /// Delete all data
    async fn reset(&self) -> StoreResult<()> {
        Err(StoreError::Unsupported(
            "O reset global está desativado na versão em nuvem para evitar perda de dados.",
        ))
    }
}
