//! Local document store
//!
//! Keeps every collection in memory and, when opened with a path, persists
//! all data to a single JSON file after each write. Uses atomic writes
//! (write to temp file, then rename) to prevent corruption.
//!
//! This backs the local deployment: a single machine, a shared admin
//! password, and full backup restore/reset.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use super::{
    CollectionSnapshot, CollectionWatch, DocumentStore, DocumentWatch, StoreError, StoreResult,
    StoredDocument, Watched,
};
use crate::backup::Backup;
use crate::models::RecordId;

/// On-disk layout of the data file
#[derive(Debug, Default, Serialize, Deserialize)]
struct DataFile {
    #[serde(default)]
    collections: BTreeMap<String, Vec<StoredDocument>>,
    #[serde(default)]
    documents: BTreeMap<String, Value>,
}

/// Every watch of a local store is loaded from the start
#[derive(Default)]
struct LocalState {
    collections: HashMap<String, watch::Sender<Watched<CollectionSnapshot>>>,
    documents: HashMap<String, watch::Sender<Watched<Option<Value>>>>,
}

impl LocalState {
    fn collection(&mut self, name: &str) -> &watch::Sender<Watched<CollectionSnapshot>> {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| watch::channel(Watched::Loaded(Vec::new())).0)
    }

    fn document(&mut self, key: String) -> &watch::Sender<Watched<Option<Value>>> {
        self.documents
            .entry(key)
            .or_insert_with(|| watch::channel(Watched::Loaded(None)).0)
    }

    fn to_file(&self) -> DataFile {
        DataFile {
            collections: self
                .collections
                .iter()
                .map(|(name, tx)| (name.clone(), contents(&tx.borrow())))
                .collect(),
            documents: self
                .documents
                .iter()
                .filter_map(|(key, tx)| {
                    tx.borrow()
                        .loaded()
                        .cloned()
                        .flatten()
                        .map(|v| (key.clone(), v))
                })
                .collect(),
        }
    }
}

fn contents(watched: &Watched<CollectionSnapshot>) -> CollectionSnapshot {
    watched.loaded().cloned().unwrap_or_default()
}

fn contains(watched: &Watched<CollectionSnapshot>, id: &RecordId) -> bool {
    watched
        .loaded()
        .is_some_and(|docs| docs.iter().any(|d| &d.id == id))
}

/// In-process document store with optional file persistence
#[derive(Default)]
pub struct LocalStore {
    state: Mutex<LocalState>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Create an empty store that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(LocalState::default()),
            path: None,
        }
    }

    /// Open a store persisted at `path`, loading existing data if present
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let mut state = LocalState::default();

        if path.exists() {
            let content =
                fs::read_to_string(&path).map_err(|e| StoreError::from_io(e, path.clone()))?;
            let file: DataFile =
                serde_json::from_str(&content).map_err(|e| StoreError::InvalidFormat {
                    path: path.clone(),
                    details: e.to_string(),
                })?;

            for (name, docs) in file.collections {
                state.collection(&name).send_replace(Watched::Loaded(docs));
            }
            for (key, body) in file.documents {
                state.document(key).send_replace(Watched::Loaded(Some(body)));
            }
            debug!("Loaded local store from {:?}", path);
        }

        Ok(Self {
            state: Mutex::new(state),
            path: Some(path),
        })
    }

    /// Path of the data file, if persisted
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert a document with a known identity, replacing any with that id
    pub fn insert_with_id(&self, collection: &str, id: RecordId, body: Value) -> StoreResult<()> {
        let mut state = self.lock();
        state.collection(collection).send_modify(|watched| {
            if let Some(docs) = watched.loaded_mut() {
                docs.retain(|d| d.id != id);
                docs.push(StoredDocument::new(id, body));
            }
        });
        self.persist(&state)
    }

    /// Current contents of a collection
    pub fn snapshot(&self, collection: &str) -> CollectionSnapshot {
        contents(&self.lock().collection(collection).borrow())
    }

    fn lock(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, state: &LocalState) -> StoreResult<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(&state.to_file()).map_err(|e| {
            StoreError::InvalidFormat {
                path: path.clone(),
                details: e.to_string(),
            }
        })?;
        atomic_write(path, &bytes)
    }
}

fn document_key(collection: &str, key: &str) -> String {
    format!("{}/{}", collection, key)
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn watch_collection(&self, collection: &str) -> StoreResult<CollectionWatch> {
        Ok(self.lock().collection(collection).subscribe())
    }

    async fn add(&self, collection: &str, body: Value) -> StoreResult<RecordId> {
        let id = RecordId::new(Uuid::new_v4().simple().to_string());
        let mut state = self.lock();
        state
            .collection(collection)
            .send_modify(|watched| {
                if let Some(docs) = watched.loaded_mut() {
                    docs.push(StoredDocument::new(id.clone(), body));
                }
            });
        self.persist(&state)?;
        debug!(collection, %id, "document added");
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &RecordId, body: Value) -> StoreResult<()> {
        let mut state = self.lock();
        let tx = state.collection(collection);

        if !contains(&tx.borrow(), id) {
            return Err(StoreError::MissingDocument {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        tx.send_modify(|watched| {
            if let Some(doc) = watched
                .loaded_mut()
                .and_then(|docs| docs.iter_mut().find(|d| &d.id == id))
            {
                doc.body = body;
            }
        });
        self.persist(&state)
    }

    async fn remove(&self, collection: &str, id: &RecordId) -> StoreResult<()> {
        let mut state = self.lock();
        let tx = state.collection(collection);

        // Removing an unknown id is a no-op and does not notify watchers
        if !contains(&tx.borrow(), id) {
            return Ok(());
        }

        tx.send_modify(|watched| {
            if let Some(docs) = watched.loaded_mut() {
                docs.retain(|d| &d.id != id);
            }
        });
        self.persist(&state)
    }

    async fn watch_document(&self, collection: &str, key: &str) -> StoreResult<DocumentWatch> {
        Ok(self.lock().document(document_key(collection, key)).subscribe())
    }

    async fn set_document(&self, collection: &str, key: &str, body: Value) -> StoreResult<()> {
        let mut state = self.lock();
        state
            .document(document_key(collection, key))
            .send_replace(Watched::Loaded(Some(body)));
        self.persist(&state)
    }

    fn backup_source(&self) -> &'static str {
        "local-backup"
    }

    fn supports_restore(&self) -> bool {
        true
    }

    async fn restore(&self, backup: &Backup) -> StoreResult<()> {
        let collections = backup.collections()?;
        let (program_collection, program_key, program) = backup.program_document()?;

        let mut state = self.lock();
        for tx in state.collections.values() {
            tx.send_replace(Watched::Loaded(Vec::new()));
        }
        for (name, docs) in collections {
            state.collection(name).send_replace(Watched::Loaded(docs));
        }
        state
            .document(document_key(program_collection, program_key))
            .send_replace(Watched::Loaded(Some(program)));
        self.persist(&state)
    }

    async fn reset(&self) -> StoreResult<()> {
        let state = self.lock();
        for tx in state.collections.values() {
            tx.send_replace(Watched::Loaded(Vec::new()));
        }
        for tx in state.documents.values() {
            tx.send_replace(Watched::Loaded(None));
        }
        self.persist(&state)
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::from_io(e, parent.to_path_buf()))?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StoreError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StoreError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StoreError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|e| StoreError::from_io(e, path.to_path_buf()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_watch_delivers_current_contents() {
        let store = LocalStore::in_memory();
        let mut rx = store.watch_collection("members").await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Watched::Loaded(Vec::new()));

        store.add("members", json!({"name": "Ana"})).await.unwrap();
        rx.changed().await.unwrap();

        let docs = contents(&rx.borrow_and_update());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].body["name"], "Ana");
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = LocalStore::in_memory();
        let err = store
            .update("members", &RecordId::from("nope"), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingDocument { .. }));
    }

    #[tokio::test]
    async fn test_update_overwrites_body() {
        let store = LocalStore::in_memory();
        let id = store
            .add("events", json!({"name": "Culto", "description": "old"}))
            .await
            .unwrap();
        store
            .update("events", &id, json!({"name": "Culto de Santa Ceia"}))
            .await
            .unwrap();

        let docs = store.snapshot("events");
        assert_eq!(docs[0].body, json!({"name": "Culto de Santa Ceia"}));
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let store = LocalStore::in_memory();
        store.remove("visitors", &RecordId::from("v404")).await.unwrap();
        assert!(store.snapshot("visitors").is_empty());
    }

    #[tokio::test]
    async fn test_document_absent_then_set() {
        let store = LocalStore::in_memory();
        let mut rx = store.watch_document("settings", "program").await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Watched::Loaded(None));

        store
            .set_document("settings", "program", json!({"content": ""}))
            .await
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Watched::Loaded(Some(json!({"content": ""}))));
    }

    #[tokio::test]
    async fn test_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");

        let id = {
            let store = LocalStore::open(&path).unwrap();
            store
                .set_document("settings", "program", json!({"content": "Domingo 18h"}))
                .await
                .unwrap();
            store.add("members", json!({"name": "Ana"})).await.unwrap()
        };

        let store = LocalStore::open(&path).unwrap();
        let docs = store.snapshot("members");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);

        let rx = store.watch_document("settings", "program").await.unwrap();
        assert_eq!(
            *rx.borrow(),
            Watched::Loaded(Some(json!({"content": "Domingo 18h"})))
        );
    }

    #[test]
    fn test_open_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        fs::write(&path, "not json").unwrap();

        let err = LocalStore::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::InvalidFormat { .. }));
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let store = LocalStore::in_memory();
        store.add("members", json!({"name": "Ana"})).await.unwrap();
        store
            .set_document("settings", "program", json!({"content": "x"}))
            .await
            .unwrap();

        store.reset().await.unwrap();

        assert!(store.snapshot("members").is_empty());
        let rx = store.watch_document("settings", "program").await.unwrap();
        assert_eq!(*rx.borrow(), Watched::Loaded(None));
    }
}
