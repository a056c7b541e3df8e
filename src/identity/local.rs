//! In-process identity provider.
//!
//! Accounts live in a shared [`AccountDirectory`] over an [`AccountStore`];
//! each client session gets its own [`LocalIdentityProvider`] holding that
//! client's signed-in identity.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::{IdentityProvider, IdentitySubscription};
use crate::error::{CredentialError, StoreError};
use crate::models::{Identity, IdentityId, StoredAccount, normalize_email};
use crate::store::{AccountStore, InMemoryAccountStore, StoreResult};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Capacity of the per-provider change channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Random salt bytes per account.
const SALT_BYTES: usize = 16;

/// Registered accounts, keyed by normalised email.
pub struct AccountDirectory {
    accounts: Arc<dyn AccountStore>,
}

impl AccountDirectory {
    /// Directory over an in-memory store; accounts are lost on restart.
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryAccountStore::new()))
    }

    pub fn with_store(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Register a new account.
    pub async fn register(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, CredentialError> {
        let email = validate_email(email)?;

        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CredentialError::new(
                CredentialError::WEAK_PASSWORD,
                format!(
                    "Password should be at least {} characters",
                    MIN_PASSWORD_LENGTH
                ),
            ));
        }

        let existing = self.accounts.find_by_email(&email).await.map_err(unavailable)?;
        if existing.is_some() {
            return Err(email_in_use());
        }

        let salt = hex::encode(rand::random::<[u8; SALT_BYTES]>());
        let identity = Identity::new(IdentityId::generate(), email);
        let account = StoredAccount {
            identity: identity.clone(),
            password_hash: hash_password(&salt, password),
            salt,
            created_at: Utc::now(),
        };

        match self.accounts.insert(account).await {
            Ok(()) => {}
            // Lost a race with a concurrent registration
            Err(StoreError::AlreadyExists(_)) => return Err(email_in_use()),
            Err(err) => return Err(unavailable(err)),
        }

        info!(identity_id = %identity.id, "Account registered");
        Ok(identity)
    }

    /// Check credentials and return the account's identity.
    ///
    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, CredentialError> {
        let email = validate_email(email)?;
        let account = self
            .accounts
            .find_by_email(&email)
            .await
            .map_err(unavailable)?
            .ok_or_else(invalid_credential)?;

        let provided = hash_password(&account.salt, password);
        if bool::from(provided.as_bytes().ct_eq(account.password_hash.as_bytes())) {
            Ok(account.identity)
        } else {
            Err(invalid_credential())
        }
    }

    /// Number of registered accounts.
    pub async fn count(&self) -> StoreResult<u64> {
        self.accounts.count().await
    }
}

impl Default for AccountDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn email_in_use() -> CredentialError {
    CredentialError::new(
        CredentialError::EMAIL_IN_USE,
        "The email address is already in use by another account",
    )
}

fn unavailable(err: StoreError) -> CredentialError {
    error!(error = %err, "Account store request failed");
    CredentialError::new(
        CredentialError::UNAVAILABLE,
        "The account service is unavailable. Try again later.",
    )
}

fn invalid_credential() -> CredentialError {
    CredentialError::new(
        CredentialError::INVALID_CREDENTIAL,
        "Invalid email or password",
    )
}

fn validate_email(email: &str) -> Result<String, CredentialError> {
    let email = normalize_email(email);
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(CredentialError::new(
            CredentialError::INVALID_EMAIL,
            "The email address is badly formatted",
        ))
    }
}

/// Salted SHA-256 digest, hex encoded.
fn hash_password(salt: &str, password: &SecretString) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.expose_secret().as_bytes());
    hex::encode(hasher.finalize())
}

/// One client's view of the identity service.
pub struct LocalIdentityProvider {
    directory: Arc<AccountDirectory>,
    current: Mutex<Option<Identity>>,
    sender: broadcast::Sender<Option<Identity>>,
}

impl LocalIdentityProvider {
    pub fn new(directory: Arc<AccountDirectory>) -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            directory,
            current: Mutex::new(None),
            sender,
        }
    }

    pub fn directory(&self) -> &Arc<AccountDirectory> {
        &self.directory
    }

    /// Swap the current identity, notifying subscribers only on an actual change.
    fn set_current(&self, next: Option<Identity>) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == next {
            return;
        }
        debug!(
            signed_in = next.is_some(),
            identity_id = ?next.as_ref().map(|i| i.id.as_str()),
            "Identity changed"
        );
        *current = next.clone();
        // No subscribers is fine
        let _ = self.sender.send(next);
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, CredentialError> {
        let identity = self.directory.register(email, password).await?;
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, CredentialError> {
        let identity = self.directory.authenticate(email, password).await?;
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) {
        self.set_current(None);
    }

    fn current(&self) -> Option<Identity> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn subscribe(&self) -> IdentitySubscription {
        // Hold the lock so no change slips between the snapshot and the receiver
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        IdentitySubscription::new(current.clone(), self.sender.subscribe())
    }
}
