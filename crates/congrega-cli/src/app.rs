//! Per-command application session
//!
//! Every command opens a controller session, waits for the first snapshot
//! of every feed, optionally signs in, runs, and tears the session down.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::time::Instant;
use tracing::{debug, warn};

use congrega_core::{
    Collaborators, Config, Controller, ControllerSettings, EntityKind, Feed, View,
};

use crate::output::Output;

/// How long to wait for the initial snapshots
const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for the notification that follows a write
const ROUND_TRIP_TIMEOUT: Duration = Duration::from_secs(5);

/// Sign-in options shared by every command
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: Option<String>,
}

pub struct App {
    pub config: Config,
    pub controller: Controller,
}

impl App {
    /// Start a session against the configured backend
    pub async fn open(config: Config, credentials: &Credentials) -> Result<Self> {
        let collaborators = Collaborators::from_config(&config)?;
        let mut controller =
            Controller::start(collaborators, ControllerSettings::from_config(&config))
                .await
                .context("Failed to start session")?;

        if !controller.wait_ready(READY_TIMEOUT).await {
            controller.shutdown();
            bail!("Timed out waiting for data from the store");
        }

        if let Some(password) = credentials.password.as_deref() {
            if let Err(e) = controller.sign_in(&credentials.user, password).await {
                controller.shutdown();
                return Err(e).context("Sign-in failed");
            }
        }

        Ok(Self { config, controller })
    }

    /// Switch to an admin or public view, failing with the placeholder text
    pub fn enter(&mut self, view: View) -> Result<()> {
        self.controller.navigate(view);
        if let Some(placeholder) = self.controller.view_access().placeholder() {
            bail!("{}", placeholder);
        }
        Ok(())
    }

    /// Wait until the store echoes a write back on every given kind
    pub async fn settle(&mut self, kinds: &[EntityKind]) {
        let mut pending: Vec<Feed> = kinds.iter().copied().map(Feed::Entity).collect();
        let deadline = Instant::now() + ROUND_TRIP_TIMEOUT;

        while !pending.is_empty() {
            match tokio::time::timeout_at(deadline, self.controller.next_notification()).await {
                Ok(Some(feed)) => {
                    debug!(?feed, "write observed");
                    pending.retain(|f| *f != feed);
                }
                Ok(None) | Err(_) => {
                    warn!(?pending, "No notification after write; showing last snapshot");
                    return;
                }
            }
        }
    }

    /// Print pending notices and end the session
    pub fn close(mut self, output: &Output) {
        for notice in self.controller.take_notices() {
            output.notice(&notice);
        }
        self.controller.shutdown();
    }
}
