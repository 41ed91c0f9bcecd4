//! Sign-in collaborators
//!
//! The remote deployment signs in against the document server (see
//! `RemoteStore`). The local deployment checks a single shared admin
//! password from the configuration.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};

pub use crate::error::AuthError;

/// Capability to sign an administrator in and out
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Watch the signed-in state; the receiver holds the current state
    /// immediately and dropping it ends the watch
    fn watch_state(&self) -> watch::Receiver<bool>;

    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<(), AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Local sign-in with one shared password
///
/// Without a configured password every sign-in fails.
pub struct SharedPasswordAuth {
    password: Option<String>,
    state: watch::Sender<bool>,
}

impl SharedPasswordAuth {
    pub fn new(password: Option<String>) -> Self {
        Self {
            password: password.filter(|p| !p.is_empty()),
            state: watch::channel(false).0,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        *self.state.borrow()
    }
}

#[async_trait]
impl AuthProvider for SharedPasswordAuth {
    fn watch_state(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    async fn sign_in(&self, _identifier: &str, secret: &str) -> Result<(), AuthError> {
        match self.password {
            Some(ref password) if password == secret => {
                info!("Administrator signed in");
                self.state.send_replace(true);
                Ok(())
            }
            Some(_) => Err(AuthError::InvalidCredentials),
            None => {
                warn!("Sign-in attempted but no admin_password is configured");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.state.send_replace(false);
        Ok(())
    }
}
