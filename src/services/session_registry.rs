//! Server-side registry of client sessions.
//!
//! Each client session owns its own identity provider and
//! `SessionController`. Clients hold an opaque bearer token; only its
//! SHA-256 hash is kept here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::SessionSettings;
use crate::identity::{AccountDirectory, LocalIdentityProvider};
use crate::session::SessionController;
use crate::store::ProfileStore;

/// Number of random bytes in a session token.
const TOKEN_BYTES: usize = 32;
/// Hex characters of the token hash shown in logs.
const LOG_PREFIX_LENGTH: usize = 8;

struct Entry {
    controller: SessionController,
    last_seen: Instant,
}

/// Client sessions keyed by token hash.
pub struct SessionRegistry {
    directory: Arc<AccountDirectory>,
    profiles: Arc<dyn ProfileStore>,
    settings: SessionSettings,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new(
        directory: Arc<AccountDirectory>,
        profiles: Arc<dyn ProfileStore>,
        settings: SessionSettings,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            profiles,
            settings,
            idle_timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shared profile store, for the admin approval routes.
    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.profiles
    }

    pub fn directory(&self) -> &Arc<AccountDirectory> {
        &self.directory
    }

    /// Open a new client session and start its controller.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self) -> (SecretString, SessionController) {
        let token = generate_token();
        let key = hash_token(token.expose_secret());

        let provider = Arc::new(LocalIdentityProvider::new(Arc::clone(&self.directory)));
        let controller =
            SessionController::new(provider, Arc::clone(&self.profiles), self.settings);
        controller.start();

        info!(session = %log_prefix(&key), "Client session opened");
        self.lock().insert(
            key,
            Entry {
                controller: controller.clone(),
                last_seen: Instant::now(),
            },
        );

        (token, controller)
    }

    /// Look up a session by token and mark it as used.
    pub fn get(&self, token: &SecretString) -> Option<SessionController> {
        let key = hash_token(token.expose_secret());
        let mut sessions = self.lock();
        let entry = sessions.get_mut(&key)?;
        entry.last_seen = Instant::now();
        Some(entry.controller.clone())
    }

    /// Close a session and stop its controller. Returns false for unknown tokens.
    pub fn close(&self, token: &SecretString) -> bool {
        let key = hash_token(token.expose_secret());
        let removed = self.lock().remove(&key);
        match removed {
            Some(entry) => {
                entry.controller.stop();
                info!(session = %log_prefix(&key), "Client session closed");
                true
            }
            None => false,
        }
    }

    /// Drop sessions unused for longer than the idle timeout.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    /// Drop sessions unused for longer than the idle timeout, as of `now`.
    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let expired: Vec<(String, Entry)> = {
            let mut sessions = self.lock();
            let keys: Vec<String> = sessions
                .iter()
                .filter(|(_, entry)| now.saturating_duration_since(entry.last_seen) > self.idle_timeout)
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| sessions.remove(&key).map(|entry| (key, entry)))
                .collect()
        };

        for (key, entry) in &expired {
            entry.controller.stop();
            debug!(session = %log_prefix(key), "Evicted idle client session");
        }

        expired.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Stop every controller, used on shutdown.
    pub fn close_all(&self) {
        let drained: Vec<Entry> = self.lock().drain().map(|(_, entry)| entry).collect();
        for entry in &drained {
            entry.controller.stop();
        }
        if !drained.is_empty() {
            info!(count = drained.len(), "Closed all client sessions");
        }
    }
}

/// Generate a random session token.
fn generate_token() -> SecretString {
    let random_bytes: [u8; TOKEN_BYTES] = rand::random();
    SecretString::from(hex::encode(random_bytes))
}

/// Hash a session token using SHA-256.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn log_prefix(key: &str) -> &str {
    key.get(..LOG_PREFIX_LENGTH).unwrap_or(key)
}
