//! Application state controller
//!
//! Owns one subscription per entity kind plus the sign-in watch for the
//! lifetime of a session, holds the latest snapshot of every collection,
//! and runs every command through the role gate before delegating to the
//! entity sync clients.
//!
//! State only changes when a notification is applied. Commands never touch
//! the snapshots directly; after a successful write, callers wait for the
//! next notification of that kind ([`Controller::wait_for`]).
//!
//! ```text
//! let mut controller = Controller::start(collaborators, settings).await?;
//! controller.wait_ready(Duration::from_secs(5)).await;
//!
//! controller.add_member(NewMember::new("Ana")).await?;
//! controller.wait_for(Feed::Entity(EntityKind::Members), timeout).await;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::{AuthError, AuthProvider, SharedPasswordAuth};
use crate::backup::Backup;
use crate::config::{Backend, Config};
use crate::confirm::{ConfirmationRequest, Decision, PendingAction};
use crate::error::{CommandError, CommandResult, Operation};
use crate::listing;
use crate::models::{
    EntityKind, Event, Member, NewEvent, NewMember, NewPrayerRequest, NewVisitor, PrayerRequest,
    PrayerRequestForm, Record, RecordId, Visitor,
};
use crate::session::{AccessPolicy, Action, Role, Session, View, ViewAccess};
use crate::store::{DocumentStore, LocalStore, RemoteStore, RemoteStoreConfig, StoreError};
use crate::sync::{self, Collection, Feed, ProgramSync, Subscription, SyncEvent};
use crate::validate::{self, DEFAULT_MAX_IMAGE_BYTES};
use crate::welcome::{self, GeminiWelcome, WelcomeGenerator};

/// Capacity of the notification channel
const EVENT_BUFFER: usize = 64;

/// External capabilities a session runs against
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub welcome: Arc<dyn WelcomeGenerator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub policy: AccessPolicy,
    pub max_image_bytes: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            policy: AccessPolicy::Open,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            policy: config.access_policy,
            max_image_bytes: config.max_image_bytes,
        }
    }
}

impl Collaborators {
    /// Build the collaborators for the configured backend
    ///
    /// The remote backend spawns its connection task, so this must run
    /// inside a tokio runtime.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let welcome: Arc<dyn WelcomeGenerator> = Arc::new(GeminiWelcome::new(
            config.welcome_api_key.clone(),
            config.welcome_model.clone(),
        )?);

        match config.backend {
            Backend::Local => {
                let path = config.local_store_path();
                let store = LocalStore::open(&path)
                    .with_context(|| format!("Failed to open data file: {:?}", path))?;
                Ok(Self {
                    store: Arc::new(store),
                    auth: Arc::new(SharedPasswordAuth::new(config.admin_password.clone())),
                    welcome,
                })
            }
            Backend::Remote => {
                let url = config
                    .remote_url
                    .clone()
                    .context("remote_url is not configured")?;
                let remote = Arc::new(RemoteStore::connect(RemoteStoreConfig::new(url)));
                Ok(Self {
                    store: remote.clone(),
                    auth: remote,
                    welcome,
                })
            }
        }
    }
}

/// Latest snapshot of every entity kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshots {
    pub members: Vec<Member>,
    pub visitors: Vec<Visitor>,
    pub events: Vec<Event>,
    pub prayer_requests: Vec<PrayerRequest>,
    pub program: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Figures shown on the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub active_members: usize,
    pub visitors: usize,
    pub upcoming_events: Vec<Event>,
    pub prayer_requests: usize,
}

/// Result of adding a visitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedVisitor {
    pub id: RecordId,
    pub welcome_message: String,
}

pub struct Controller {
    members: Collection<Member>,
    visitors: Collection<Visitor>,
    events: Collection<Event>,
    prayer_requests: Collection<PrayerRequest>,
    program: ProgramSync,
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
    welcome: Arc<dyn WelcomeGenerator>,
    max_image_bytes: usize,
    session: Session,
    snapshots: Snapshots,
    subscriptions: HashMap<Feed, Subscription>,
    received: HashSet<Feed>,
    notifications: mpsc::Receiver<SyncEvent>,
    notices: Vec<Notice>,
    closed: bool,
}

impl Controller {
    /// Start a session: open every subscription and the sign-in watch
    pub async fn start(
        collaborators: Collaborators,
        settings: ControllerSettings,
    ) -> Result<Self, StoreError> {
        let Collaborators {
            store,
            auth,
            welcome,
        } = collaborators;
        let (tx, notifications) = mpsc::channel(EVENT_BUFFER);

        let members = Collection::<Member>::new(Arc::clone(&store));
        let visitors = Collection::<Visitor>::new(Arc::clone(&store));
        let events = Collection::<Event>::new(Arc::clone(&store));
        let prayer_requests = Collection::<PrayerRequest>::new(Arc::clone(&store));
        let program = ProgramSync::new(Arc::clone(&store));

        let subscribed = tokio::try_join!(
            members.subscribe(tx.clone()),
            visitors.subscribe(tx.clone()),
            events.subscribe(tx.clone()),
            prayer_requests.subscribe(tx.clone()),
            program.subscribe(tx.clone()),
        )?;
        let auth_watch = sync::watch_auth(auth.as_ref(), tx);

        let (m, v, e, p, prog) = subscribed;
        let subscriptions = [m, v, e, p, prog, auth_watch]
            .into_iter()
            .map(|s| (s.feed(), s))
            .collect();

        info!(policy = %settings.policy, "Session started");

        Ok(Self {
            members,
            visitors,
            events,
            prayer_requests,
            program,
            store,
            auth,
            welcome,
            max_image_bytes: settings.max_image_bytes,
            session: Session::new(settings.policy),
            snapshots: Snapshots::default(),
            subscriptions,
            received: HashSet::new(),
            notifications,
            notices: Vec::new(),
            closed: false,
        })
    }

    // ==================== Notifications ====================

    /// Apply one notification; returns its feed unless it was ignored
    fn apply(&mut self, event: SyncEvent) -> Option<Feed> {
        let feed = event.feed();
        if !self.subscriptions.contains_key(&feed) {
            debug!(?feed, "dropping notification for a closed subscription");
            return None;
        }

        match event {
            SyncEvent::Members(items) => self.snapshots.members = items,
            SyncEvent::Visitors(items) => self.snapshots.visitors = items,
            SyncEvent::Events(items) => self.snapshots.events = items,
            SyncEvent::PrayerRequests(items) => self.snapshots.prayer_requests = items,
            SyncEvent::Program(text) => self.snapshots.program = text,
            SyncEvent::SignedIn(signed_in) => {
                let role = if signed_in { Role::Admin } else { Role::Public };
                if self.session.set_role(role) {
                    info!(?role, "Session role changed");
                }
            }
        }
        debug!(?feed, "notification applied");
        self.received.insert(feed);
        Some(feed)
    }

    /// Apply every notification already queued, without waiting
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.notifications.try_recv() {
            if self.apply(event).is_some() {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next notification and apply it
    pub async fn next_notification(&mut self) -> Option<Feed> {
        loop {
            let event = self.notifications.recv().await?;
            if let Some(feed) = self.apply(event) {
                return Some(feed);
            }
        }
    }

    /// Apply notifications until one arrives from `feed`
    ///
    /// Returns false on timeout or when the session is closed.
    pub async fn wait_for(&mut self, feed: Feed, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.notifications.recv()).await {
                Ok(Some(event)) => {
                    if self.apply(event) == Some(feed) {
                        return true;
                    }
                }
                Ok(None) | Err(_) => return false,
            }
        }
    }

    /// Wait until every open subscription has delivered its first snapshot
    pub async fn wait_ready(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.is_ready() {
            match tokio::time::timeout_at(deadline, self.notifications.recv()).await {
                Ok(Some(event)) => {
                    self.apply(event);
                }
                Ok(None) | Err(_) => return false,
            }
        }
        true
    }

    pub fn is_ready(&self) -> bool {
        self.subscriptions
            .keys()
            .all(|feed| self.received.contains(feed))
    }

    /// Stop one feed; its snapshot stays as last delivered
    pub fn unsubscribe(&mut self, feed: Feed) {
        if let Some(subscription) = self.subscriptions.remove(&feed) {
            subscription.unsubscribe();
            info!(?feed, "Unsubscribed");
        }
    }

    /// End the session, releasing every watch exactly once
    ///
    /// Safe to call more than once; later calls do nothing. Writes already
    /// in flight finish on their own.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for (_, subscription) in self.subscriptions.drain() {
            subscription.unsubscribe();
        }
        info!("Session ended");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // ==================== Read side ====================

    pub fn snapshots(&self) -> &Snapshots {
        &self.snapshots
    }

    pub fn members(&self) -> &[Member] {
        &self.snapshots.members
    }

    pub fn visitors(&self) -> &[Visitor] {
        &self.snapshots.visitors
    }

    pub fn events(&self) -> &[Event] {
        &self.snapshots.events
    }

    pub fn prayer_requests(&self) -> &[PrayerRequest] {
        &self.snapshots.prayer_requests
    }

    pub fn program(&self) -> &str {
        &self.snapshots.program
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn navigate(&mut self, view: View) {
        self.session.navigate(view);
    }

    /// What to render for the active view
    pub fn view_access(&self) -> ViewAccess {
        self.session.resolve_view()
    }

    /// Take the notices produced since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn dashboard(&self, now: NaiveDateTime) -> DashboardSummary {
        DashboardSummary {
            active_members: self.snapshots.members.iter().filter(|m| m.is_active()).count(),
            visitors: self.snapshots.visitors.len(),
            upcoming_events: listing::upcoming_events(&self.snapshots.events, now)
                .into_iter()
                .cloned()
                .collect(),
            prayer_requests: self.snapshots.prayer_requests.len(),
        }
    }

    // ==================== Sign-in ====================

    /// Check credentials; on success the session becomes admin
    ///
    /// A failed attempt leaves role and view untouched.
    pub async fn sign_in(&mut self, identifier: &str, secret: &str) -> Result<(), AuthError> {
        match self.auth.sign_in(identifier, secret).await {
            Ok(()) => {
                if self.session.set_role(Role::Admin) {
                    info!("Administrator signed in");
                }
                Ok(())
            }
            Err(e) => {
                warn!("Sign-in failed: {}", e);
                Err(e)
            }
        }
    }

    /// Sign out; the session is public on the dashboard afterwards
    pub async fn sign_out(&mut self) -> Result<(), AuthError> {
        let result = self.auth.sign_out().await;
        if let Err(ref e) = result {
            warn!("Sign-out not confirmed by provider: {}", e);
        }
        self.session.set_role(Role::Public);
        self.session.navigate(View::Dashboard);
        result
    }

    // ==================== Commands ====================

    fn ensure_open(&self) -> CommandResult<()> {
        if self.closed {
            return Err(CommandError::Closed);
        }
        Ok(())
    }

    fn check(&self, action: Action) -> CommandResult<()> {
        self.ensure_open()?;
        self.session.authorize(action)
    }

    /// Turn a failure into a notice and log it
    fn report<T>(&mut self, operation: Operation, result: CommandResult<T>) -> CommandResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Command failed: {}", e);
                self.notices.push(Notice::error(e.user_message(operation)));
                Err(e)
            }
        }
    }

    fn find<'a, T: Record>(items: &'a [T], id: &RecordId) -> CommandResult<&'a T> {
        items
            .iter()
            .find(|item| item.id() == id)
            .ok_or_else(|| CommandError::NotFound {
                kind: T::KIND,
                id: id.clone(),
            })
    }

    // Members

    pub async fn add_member(&mut self, member: NewMember) -> CommandResult<RecordId> {
        let result: CommandResult<_> = async {
            self.check(Action::Add(EntityKind::Members))?;
            validate::member(&member)?;
            Ok(self.members.add(&member).await?)
        }
        .await;
        self.report(Operation::Save, result)
    }

    pub async fn update_member(&mut self, member: Member) -> CommandResult<()> {
        let result: CommandResult<_> = async {
            self.check(Action::Update(EntityKind::Members))?;
            let (_, draft) = member.clone().into_parts();
            validate::member(&draft)?;
            Ok(self.members.update(&member).await?)
        }
        .await;
        self.report(Operation::Update, result)
    }

    pub async fn delete_member(&mut self, id: &RecordId) -> CommandResult<()> {
        let result: CommandResult<_> = async {
            self.check(Action::Delete(EntityKind::Members))?;
            Ok(self.members.remove(id).await?)
        }
        .await;
        self.report(Operation::Delete, result)
    }

    // Visitors

    /// Add a visitor and produce a welcome message for them
    pub async fn add_visitor(&mut self, visitor: NewVisitor) -> CommandResult<AddedVisitor> {
        let result: CommandResult<_> = async {
            self.check(Action::Add(EntityKind::Visitors))?;
            validate::visitor(&visitor)?;
            Ok(self.visitors.add(&visitor).await?)
        }
        .await;
        let id = self.report(Operation::Save, result)?;

        let welcome_message = welcome::welcome_message(self.welcome.as_ref(), &visitor.name).await;
        Ok(AddedVisitor {
            id,
            welcome_message,
        })
    }

    pub async fn update_visitor(&mut self, visitor: Visitor) -> CommandResult<()> {
        let result: CommandResult<_> = async {
            self.check(Action::Update(EntityKind::Visitors))?;
            let (_, draft) = visitor.clone().into_parts();
            validate::visitor(&draft)?;
            Ok(self.visitors.update(&visitor).await?)
        }
        .await;
        self.report(Operation::Update, result)
    }

    pub async fn delete_visitor(&mut self, id: &RecordId) -> CommandResult<()> {
        let result: CommandResult<_> = async {
            self.check(Action::Delete(EntityKind::Visitors))?;
            Ok(self.visitors.remove(id).await?)
        }
        .await;
        self.report(Operation::Delete, result)
    }

    /// Turn a visitor into a member
    ///
    /// Adds the member first and only then removes the visitor. If the add
    /// fails the visitor is left alone. If the removal fails the new member
    /// stays and the command reports [`CommandError::PartialConversion`].
    /// On success the session switches to the members view.
    pub async fn convert_visitor(&mut self, id: &RecordId) -> CommandResult<RecordId> {
        let result: CommandResult<_> = async {
            self.check(Action::ConvertVisitor)?;
            let visitor = Self::find(&self.snapshots.visitors, id)?.clone();

            let member_id = self.members.add(&NewMember::from_visitor(&visitor)).await?;
            if let Err(source) = self.visitors.remove(id).await {
                return Err(CommandError::PartialConversion {
                    member_created: member_id,
                    source,
                });
            }
            Ok((member_id, visitor.name))
        }
        .await;

        let (member_id, name) = self.report(Operation::Save, result)?;
        info!(visitor = %id, member = %member_id, "Visitor converted");
        self.notices
            .push(Notice::info(format!("{} foi convertido(a) para membro!", name)));
        self.session.navigate(View::Members);
        Ok(member_id)
    }

    // Events

    pub async fn add_event(&mut self, event: NewEvent) -> CommandResult<RecordId> {
        let result: CommandResult<_> = async {
            self.check(Action::Add(EntityKind::Events))?;
            validate::event(&event, self.max_image_bytes)?;
            Ok(self.events.add(&event).await?)
        }
        .await;
        self.report(Operation::Save, result)
    }

    pub async fn update_event(&mut self, event: Event) -> CommandResult<()> {
        let result: CommandResult<_> = async {
            self.check(Action::Update(EntityKind::Events))?;
            let (_, draft) = event.clone().into_parts();
            validate::event(&draft, self.max_image_bytes)?;
            Ok(self.events.update(&event).await?)
        }
        .await;
        self.report(Operation::Update, result)
    }

    pub async fn delete_event(&mut self, id: &RecordId) -> CommandResult<()> {
        let result: CommandResult<_> = async {
            self.check(Action::Delete(EntityKind::Events))?;
            Ok(self.events.remove(id).await?)
        }
        .await;
        self.report(Operation::Delete, result)
    }

    // Prayer requests

    /// Add a prayer request dated today
    pub async fn add_prayer_request(&mut self, form: PrayerRequestForm) -> CommandResult<RecordId> {
        self.add_prayer_request_on(form, Local::now().date_naive())
            .await
    }

    /// Add a prayer request with an explicit creation date
    pub async fn add_prayer_request_on(
        &mut self,
        form: PrayerRequestForm,
        date: NaiveDate,
    ) -> CommandResult<RecordId> {
        let result: CommandResult<_> = async {
            self.check(Action::Add(EntityKind::PrayerRequests))?;
            validate::prayer_request(&form)?;
            let draft = prayer_draft(form, date);
            Ok(self.prayer_requests.add(&draft).await?)
        }
        .await;
        self.report(Operation::Save, result)
    }

    /// Replace the text, name and anonymity of a request; its date is kept
    pub async fn update_prayer_request(
        &mut self,
        id: &RecordId,
        form: PrayerRequestForm,
    ) -> CommandResult<()> {
        let result: CommandResult<_> = async {
            self.check(Action::Update(EntityKind::PrayerRequests))?;
            validate::prayer_request(&form)?;
            let stored = Self::find(&self.snapshots.prayer_requests, id)?;
            let updated = PrayerRequest::from_draft(id.clone(), prayer_draft(form, stored.date));
            Ok(self.prayer_requests.update(&updated).await?)
        }
        .await;
        self.report(Operation::Update, result)
    }

    pub async fn delete_prayer_request(&mut self, id: &RecordId) -> CommandResult<()> {
        let result: CommandResult<_> = async {
            self.check(Action::Delete(EntityKind::PrayerRequests))?;
            Ok(self.prayer_requests.remove(id).await?)
        }
        .await;
        self.report(Operation::Delete, result)
    }

    // Program

    pub async fn save_program(&mut self, text: &str) -> CommandResult<()> {
        let result: CommandResult<_> = async {
            self.check(Action::Update(EntityKind::Program))?;
            Ok(self.program.save(text).await?)
        }
        .await;
        self.report(Operation::Save, result)
    }

    // Database

    /// Dump every snapshot currently held
    pub fn export(&mut self, now: DateTime<Utc>) -> CommandResult<Backup> {
        let result = self.check(Action::Export).map(|()| {
            Backup::from_snapshots(
                &self.snapshots.members,
                &self.snapshots.visitors,
                &self.snapshots.events,
                &self.snapshots.prayer_requests,
                &self.snapshots.program,
                self.store.backup_source(),
                now,
            )
        });
        self.report(Operation::Save, result)
    }

    /// Replace all data with a backup; returns the number of records restored
    pub async fn import(&mut self, backup: &Backup) -> CommandResult<usize> {
        let result: CommandResult<_> = async {
            self.check_import(backup)?;
            match self.store.restore(backup).await {
                Ok(()) => Ok(backup.record_count()),
                Err(StoreError::Unsupported(_)) => Err(CommandError::ImportDisabled),
                Err(e) => Err(e.into()),
            }
        }
        .await;

        let count = self.report(Operation::Save, result)?;
        info!(count, source = %backup.source, "Backup imported");
        self.notices.push(Notice::info(format!(
            "Backup restaurado: {} registros.",
            count
        )));
        Ok(count)
    }

    fn check_import(&self, backup: &Backup) -> CommandResult<()> {
        self.check(Action::Import)?;
        if !self.store.supports_restore() {
            return Err(CommandError::ImportDisabled);
        }
        if !backup.is_supported_version() {
            return Err(CommandError::invalid(format!(
                "Versão de backup não suportada: {}",
                backup.version
            )));
        }
        Ok(())
    }

    /// Delete all data
    pub async fn reset(&mut self) -> CommandResult<()> {
        let result: CommandResult<_> = async {
            self.check(Action::Reset)?;
            Ok(self.store.reset().await?)
        }
        .await;
        self.report(Operation::Delete, result)?;
        warn!("All data was reset");
        Ok(())
    }

    // ==================== Confirmation ====================

    /// Prepare a destructive command for confirmation
    ///
    /// Fails early if the role may not run it or the record is not in the
    /// current snapshot.
    pub fn request_confirmation(
        &mut self,
        action: PendingAction,
    ) -> CommandResult<ConfirmationRequest> {
        let result = self.check_pending(&action);
        self.report(Operation::Delete, result)?;
        Ok(ConfirmationRequest::new(action))
    }

    fn check_pending(&self, action: &PendingAction) -> CommandResult<()> {
        match action {
            PendingAction::Delete { kind, id } => {
                self.check(Action::Delete(*kind))?;
                match kind {
                    EntityKind::Members => Self::find(&self.snapshots.members, id).map(drop),
                    EntityKind::Visitors => Self::find(&self.snapshots.visitors, id).map(drop),
                    EntityKind::Events => Self::find(&self.snapshots.events, id).map(drop),
                    EntityKind::PrayerRequests => {
                        Self::find(&self.snapshots.prayer_requests, id).map(drop)
                    }
                    EntityKind::Program => Err(CommandError::invalid(
                        "A programação não pode ser excluída.",
                    )),
                }
            }
            PendingAction::ConvertVisitor { id } => {
                self.check(Action::ConvertVisitor)?;
                Self::find(&self.snapshots.visitors, id).map(drop)
            }
            PendingAction::Import(backup) => self.check_import(backup),
            PendingAction::Reset => self.check(Action::Reset),
        }
    }

    /// Resolve a confirmation; returns whether the action ran
    pub async fn confirm(
        &mut self,
        request: ConfirmationRequest,
        decision: Decision,
    ) -> CommandResult<bool> {
        let Some(action) = request.resolve(decision) else {
            debug!("Confirmation cancelled");
            return Ok(false);
        };

        match action {
            PendingAction::Delete { kind, id } => match kind {
                EntityKind::Members => self.delete_member(&id).await?,
                EntityKind::Visitors => self.delete_visitor(&id).await?,
                EntityKind::Events => self.delete_event(&id).await?,
                EntityKind::PrayerRequests => self.delete_prayer_request(&id).await?,
                EntityKind::Program => {
                    let result = Err(CommandError::invalid(
                        "A programação não pode ser excluída.",
                    ));
                    return self.report(Operation::Delete, result);
                }
            },
            PendingAction::ConvertVisitor { id } => {
                self.convert_visitor(&id).await?;
            }
            PendingAction::Import(backup) => {
                self.import(&backup).await?;
            }
            PendingAction::Reset => self.reset().await?,
        }
        Ok(true)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Stored form of a prayer request; anonymous requests never keep a name
fn prayer_draft(form: PrayerRequestForm, date: NaiveDate) -> NewPrayerRequest {
    let name = if form.is_anonymous {
        None
    } else {
        form.name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
    };
    NewPrayerRequest {
        name,
        request: form.request.trim().to_string(),
        is_anonymous: form.is_anonymous,
        date,
    }
}
