//! Congrega Core Library
//!
//! This crate provides the core of Congrega, an administration tool for a
//! church congregation: member roster, visitors and their conversion to
//! members, events calendar, weekly program and a public prayer board.
//!
//! # Architecture
//!
//! - **Document store**: source of truth. Either a local JSON data file or
//!   a remote document server reached over WebSocket.
//! - **Entity sync clients**: one per entity kind, turning store
//!   notifications into typed snapshots and forwarding writes.
//! - **Controller**: holds the latest snapshot of everything, the session
//!   role and the active view, and runs every command through the role gate.
//!
//! State flows one way: a write goes to the store, and the store's next
//! notification updates the controller.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let collaborators = Collaborators::from_config(&config)?;
//! let mut controller =
//!     Controller::start(collaborators, ControllerSettings::from_config(&config)).await?;
//! controller.wait_ready(Duration::from_secs(5)).await;
//!
//! controller.sign_in("admin", "password").await?;
//! controller.add_member(NewMember::new("Ana")).await?;
//! ```
//!
//! # Modules
//!
//! - `controller`: application state and command handlers (main entry point)
//! - `models`: members, visitors, events, prayer requests, program
//! - `sync`: entity sync clients and subscriptions
//! - `store`: document store backends
//! - `session`: role gate, views and access policy
//! - `auth`: sign-in providers
//! - `welcome`: welcome messages for new visitors
//! - `listing`: search, ordering and pagination of snapshots
//! - `backup`: export and import
//! - `config`: application configuration

pub mod auth;
pub mod backup;
pub mod config;
pub mod confirm;
pub mod controller;
pub mod error;
pub mod listing;
pub mod models;
pub mod session;
pub mod store;
pub mod sync;
pub mod validate;
pub mod welcome;

pub use auth::{AuthProvider, SharedPasswordAuth};
pub use backup::Backup;
pub use config::{Backend, Config};
pub use confirm::{ConfirmationRequest, Decision, PendingAction};
pub use controller::{
    AddedVisitor, Collaborators, Controller, ControllerSettings, DashboardSummary, Notice,
    NoticeLevel, Snapshots,
};
pub use error::{AuthError, CommandError, CommandResult, GenerationError, Operation};
pub use models::{
    EntityKind, Event, Member, MemberStatus, NewEvent, NewMember, NewPrayerRequest, NewVisitor,
    PrayerRequest, PrayerRequestForm, RecordId, Visitor,
};
pub use session::{AccessPolicy, Role, Session, View, ViewAccess};
pub use store::{DocumentStore, LocalStore, RemoteStore, StoreError};
pub use sync::Feed;
pub use welcome::{GeminiWelcome, WelcomeGenerator};
