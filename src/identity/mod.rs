//! Identity provider boundary.
//!
//! Sign-up, sign-in and sign-out against an identity service, plus a
//! change-notification subscription. Credential failures come back as
//! [`CredentialError`] values and are never raised as panics.

pub mod local;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::CredentialError;
use crate::models::Identity;

pub use local::{AccountDirectory, LocalIdentityProvider};

/// Identity service adapter.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new identity. The new identity becomes the current one.
    async fn sign_up(&self, email: &str, password: &SecretString)
    -> Result<Identity, CredentialError>;

    /// Authenticate an existing identity and make it current.
    async fn sign_in(&self, email: &str, password: &SecretString)
    -> Result<Identity, CredentialError>;

    /// Clear the current identity.
    async fn sign_out(&self);

    /// The identity currently signed in, if any.
    fn current(&self) -> Option<Identity>;

    /// Subscribe to identity changes.
    fn subscribe(&self) -> IdentitySubscription;
}

/// Stream of identity changes for one subscriber.
///
/// The first [`next`](Self::next) yields the identity that was current when
/// the subscription was taken; every later call yields one transition, in
/// the order the provider applied them. Dropping the subscription
/// unsubscribes.
pub struct IdentitySubscription {
    initial: Option<Option<Identity>>,
    receiver: broadcast::Receiver<Option<Identity>>,
}

impl IdentitySubscription {
    /// Build a subscription from the current identity and a receiver taken
    /// atomically with it.
    pub fn new(current: Option<Identity>, receiver: broadcast::Receiver<Option<Identity>>) -> Self {
        Self {
            initial: Some(current),
            receiver,
        }
    }

    /// Wait for the next identity change.
    ///
    /// Returns `None` once the provider has gone away.
    pub async fn next(&mut self) -> Option<Option<Identity>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Identity subscriber lagged behind, skipping stale changes");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving changes.
    pub fn unsubscribe(self) {
        drop(self);
    }
}
