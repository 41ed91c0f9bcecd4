//! Entity sync clients
//!
//! Bridge one store collection (or the program document) to typed
//! snapshots. A subscription spawns a forwarding task that turns every
//! store notification into a [`SyncEvent`] on the controller's channel.
//! Writes go straight to the store and are never applied locally; their
//! effect shows up with the next notification.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::auth::AuthProvider;
use crate::models::{
    EntityKind, Event, Member, PrayerRequest, ProgramDocument, Record, RecordId, Visitor,
    PROGRAM_COLLECTION, PROGRAM_KEY,
};
use crate::store::{CollectionSnapshot, DocumentStore, StoreError, StoreResult, Watched};

/// A source of notifications for the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Entity(EntityKind),
    Auth,
}

/// A notification delivered to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Members(Vec<Member>),
    Visitors(Vec<Visitor>),
    Events(Vec<Event>),
    PrayerRequests(Vec<PrayerRequest>),
    /// Program text; empty when the document does not exist yet
    Program(String),
    /// Sign-in state reported by the auth provider
    SignedIn(bool),
}

impl SyncEvent {
    pub fn feed(&self) -> Feed {
        match self {
            SyncEvent::Members(_) => Feed::Entity(EntityKind::Members),
            SyncEvent::Visitors(_) => Feed::Entity(EntityKind::Visitors),
            SyncEvent::Events(_) => Feed::Entity(EntityKind::Events),
            SyncEvent::PrayerRequests(_) => Feed::Entity(EntityKind::PrayerRequests),
            SyncEvent::Program(_) => Feed::Entity(EntityKind::Program),
            SyncEvent::SignedIn(_) => Feed::Auth,
        }
    }
}

/// A record type that can be delivered as a [`SyncEvent`]
pub trait Synced: Record {
    fn snapshot_event(items: Vec<Self>) -> SyncEvent;
}

impl Synced for Member {
    fn snapshot_event(items: Vec<Self>) -> SyncEvent {
        SyncEvent::Members(items)
    }
}

impl Synced for Visitor {
    fn snapshot_event(items: Vec<Self>) -> SyncEvent {
        SyncEvent::Visitors(items)
    }
}

impl Synced for Event {
    fn snapshot_event(items: Vec<Self>) -> SyncEvent {
        SyncEvent::Events(items)
    }
}

impl Synced for PrayerRequest {
    fn snapshot_event(items: Vec<Self>) -> SyncEvent {
        SyncEvent::PrayerRequests(items)
    }
}

/// Handle to a live watch
///
/// Calling [`Subscription::unsubscribe`] or dropping the handle stops the
/// forwarding task and releases the store watch.
#[derive(Debug)]
pub struct Subscription {
    feed: Feed,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn feed(&self) -> Feed {
        self.feed
    }

    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
        debug!(feed = ?self.feed, "subscription released");
    }
}

/// Forward every value of a watch, starting with the current one
///
/// Values that `to_event` maps to `None` (a watch the store has not
/// loaded yet) are not delivered.
fn forward<T, F>(
    feed: Feed,
    mut rx: watch::Receiver<T>,
    events: mpsc::Sender<SyncEvent>,
    to_event: F,
) -> Subscription
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> Option<SyncEvent> + Send + 'static,
{
    let task = tokio::spawn(async move {
        loop {
            let event = {
                let value = rx.borrow_and_update();
                to_event(&*value)
            };
            if let Some(event) = event {
                if events.send(event).await.is_err() {
                    break;
                }
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    });
    Subscription { feed, task }
}

fn collection_event<T: Synced>(watched: &Watched<CollectionSnapshot>) -> Option<SyncEvent> {
    watched
        .loaded()
        .map(|snapshot| T::snapshot_event(decode_snapshot::<T>(snapshot)))
}

fn program_event(watched: &Watched<Option<Value>>) -> Option<SyncEvent> {
    watched
        .loaded()
        .map(|body| SyncEvent::Program(program_text(body.as_ref())))
}

/// Decode a snapshot, skipping documents that don't match the record shape
fn decode_snapshot<T: Record>(snapshot: &CollectionSnapshot) -> Vec<T> {
    snapshot
        .iter()
        .filter_map(
            |doc| match serde_json::from_value::<T::Draft>(doc.body.clone()) {
                Ok(draft) => Some(T::from_draft(doc.id.clone(), draft)),
                Err(e) => {
                    warn!(
                        collection = T::KIND.collection(),
                        id = %doc.id,
                        "Skipping undecodable document: {}",
                        e
                    );
                    None
                }
            },
        )
        .collect()
}

fn encode<T: Record>(draft: &T::Draft) -> StoreResult<Value> {
    serde_json::to_value(draft).map_err(|source| StoreError::Decode {
        collection: T::KIND.collection().to_string(),
        source,
    })
}

/// Sync client for one collection-backed entity kind
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<T: Synced> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    fn name(&self) -> &'static str {
        T::KIND.collection()
    }

    /// Start delivering snapshots of this collection to `events`
    ///
    /// The current contents are delivered as soon as the store has them,
    /// then again after every change.
    pub async fn subscribe(&self, events: mpsc::Sender<SyncEvent>) -> StoreResult<Subscription> {
        let rx = self.store.watch_collection(self.name()).await?;
        Ok(forward(
            Feed::Entity(T::KIND),
            rx,
            events,
            collection_event::<T>,
        ))
    }

    pub async fn add(&self, draft: &T::Draft) -> StoreResult<RecordId> {
        self.store.add(self.name(), encode::<T>(draft)?).await
    }

    /// Overwrite every field of the record with the given identity
    pub async fn update(&self, record: &T) -> StoreResult<()> {
        let (id, draft) = record.clone().into_parts();
        self.store.update(self.name(), &id, encode::<T>(&draft)?).await
    }

    pub async fn remove(&self, id: &RecordId) -> StoreResult<()> {
        self.store.remove(self.name(), id).await
    }
}

/// Sync client for the singleton program document
#[derive(Clone)]
pub struct ProgramSync {
    store: Arc<dyn DocumentStore>,
}

impl ProgramSync {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Start delivering the program text; absent documents read as ""
    pub async fn subscribe(&self, events: mpsc::Sender<SyncEvent>) -> StoreResult<Subscription> {
        let rx = self
            .store
            .watch_document(PROGRAM_COLLECTION, PROGRAM_KEY)
            .await?;
        Ok(forward(
            Feed::Entity(EntityKind::Program),
            rx,
            events,
            program_event,
        ))
    }

    /// Overwrite the program text, creating the document if absent
    pub async fn save(&self, text: &str) -> StoreResult<()> {
        let body = serde_json::to_value(ProgramDocument {
            content: text.to_string(),
        })
        .map_err(|source| StoreError::Decode {
            collection: PROGRAM_COLLECTION.to_string(),
            source,
        })?;
        self.store
            .set_document(PROGRAM_COLLECTION, PROGRAM_KEY, body)
            .await
    }
}

fn program_text(body: Option<&Value>) -> String {
    match body {
        Some(body) => match serde_json::from_value::<ProgramDocument>(body.clone()) {
            Ok(doc) => doc.content,
            Err(e) => {
                warn!("Unreadable program document: {}", e);
                String::new()
            }
        },
        None => String::new(),
    }
}

/// Deliver sign-in state changes to `events`
pub fn watch_auth(auth: &dyn AuthProvider, events: mpsc::Sender<SyncEvent>) -> Subscription {
    forward(Feed::Auth, auth.watch_state(), events, |signed_in| {
        Some(SyncEvent::SignedIn(*signed_in))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberStatus, NewMember};
    use crate::store::{LocalStore, StoredDocument};
    use serde_json::json;
    use std::time::Duration;

    async fn recv(rx: &mut mpsc::Receiver<SyncEvent>) -> SyncEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_subscribe_delivers_empty_then_changes() {
        let store: Arc<dyn DocumentStore> = Arc::new(LocalStore::in_memory());
        let members = Collection::<Member>::new(Arc::clone(&store));
        let (tx, mut rx) = mpsc::channel(16);

        let _sub = members.subscribe(tx).await.unwrap();
        assert_eq!(recv(&mut rx).await, SyncEvent::Members(vec![]));

        let id = members.add(&NewMember::new("Ana")).await.unwrap();
        match recv(&mut rx).await {
            SyncEvent::Members(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].id, id);
                assert_eq!(items[0].status, MemberStatus::Active);
            }
            other => panic!("Expected members snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let store = Arc::new(LocalStore::in_memory());
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let members = Collection::<Member>::new(dyn_store);
        let (tx, mut rx) = mpsc::channel(16);

        let sub = members.subscribe(tx).await.unwrap();
        recv(&mut rx).await;
        sub.unsubscribe();

        members.add(&NewMember::new("Ana")).await.unwrap();
        // The sender was owned by the aborted task, so the channel closes
        let next = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_documents_are_skipped() {
        let store = Arc::new(LocalStore::in_memory());
        store
            .insert_with_id("members", RecordId::from("bad"), json!({"name": 42}))
            .unwrap();
        store
            .insert_with_id(
                "members",
                RecordId::from("ok"),
                json!({"name": "Ana", "role": "Membro", "status": "Ativo"}),
            )
            .unwrap();

        let members = Collection::<Member>::new(store);
        let (tx, mut rx) = mpsc::channel(16);
        let _sub = members.subscribe(tx).await.unwrap();

        match recv(&mut rx).await {
            SyncEvent::Members(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].id, RecordId::from("ok"));
            }
            other => panic!("Expected members snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_missing_record_fails() {
        let store: Arc<dyn DocumentStore> = Arc::new(LocalStore::in_memory());
        let members = Collection::<Member>::new(store);
        let ghost = Member::from_draft(RecordId::from("ghost"), NewMember::new("Ana"));

        let err = members.update(&ghost).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingDocument { .. }));
    }

    #[tokio::test]
    async fn test_pending_watch_waits_for_first_contents() {
        let (tx, rx) = watch::channel(Watched::<CollectionSnapshot>::Pending);
        let (events, mut events_rx) = mpsc::channel(16);
        let _sub = forward(
            Feed::Entity(EntityKind::Members),
            rx,
            events,
            collection_event::<Member>,
        );

        let early = tokio::time::timeout(Duration::from_millis(100), events_rx.recv()).await;
        assert!(early.is_err(), "pending watch delivered {:?}", early);

        tx.send_replace(Watched::Loaded(vec![StoredDocument::new(
            RecordId::from("m1"),
            json!({"name": "Ana"}),
        )]));
        match recv(&mut events_rx).await {
            SyncEvent::Members(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].name, "Ana");
            }
            other => panic!("Expected members snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pending_program_is_not_read_as_empty() {
        let (tx, rx) = watch::channel(Watched::<Option<Value>>::Pending);
        let (events, mut events_rx) = mpsc::channel(16);
        let _sub = forward(Feed::Entity(EntityKind::Program), rx, events, program_event);

        let early = tokio::time::timeout(Duration::from_millis(100), events_rx.recv()).await;
        assert!(early.is_err());

        // Loaded and absent is a real, empty program
        tx.send_replace(Watched::Loaded(None));
        assert_eq!(recv(&mut events_rx).await, SyncEvent::Program(String::new()));
    }

    #[tokio::test]
    async fn test_program_absent_reads_empty() {
        let store: Arc<dyn DocumentStore> = Arc::new(LocalStore::in_memory());
        let program = ProgramSync::new(store);
        let (tx, mut rx) = mpsc::channel(16);

        let _sub = program.subscribe(tx).await.unwrap();
        assert_eq!(recv(&mut rx).await, SyncEvent::Program(String::new()));

        program.save("Domingo: Culto às 18h").await.unwrap();
        assert_eq!(
            recv(&mut rx).await,
            SyncEvent::Program("Domingo: Culto às 18h".to_string())
        );
    }
}
