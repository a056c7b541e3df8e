//! In-memory profile and account stores.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use super::{AccountStore, ProfileStore, StoreError, StoreResult};
use crate::models::{ApprovalStatus, IdentityId, NewProfile, Profile, ProfileUpdate, StoredAccount};

/// Profile store held in process memory. Used in development and tests.
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<IdentityId, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored profiles.
    pub fn len(&self) -> usize {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, id: &IdentityId) -> StoreResult<Option<Profile>> {
        Ok(self
            .profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned())
    }

    async fn create(&self, id: &IdentityId, profile: NewProfile) -> StoreResult<Profile> {
        let mut profiles = self
            .profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if profiles.contains_key(id) {
            return Err(StoreError::AlreadyExists(format!("Profile {id}")));
        }

        let now = Utc::now();
        let stored = Profile {
            id: id.clone(),
            role: profile.role,
            status: profile.status,
            fields: profile.fields,
            created_at: now,
            updated_at: now,
        };
        profiles.insert(id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: &IdentityId, update: ProfileUpdate) -> StoreResult<Profile> {
        let mut profiles = self
            .profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("Profile {id}")))?;
        update.apply(profile, Utc::now());
        Ok(profile.clone())
    }

    async fn list_by_status(&self, status: ApprovalStatus) -> StoreResult<Vec<Profile>> {
        let mut matching: Vec<Profile> = self
            .profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(matching)
    }
}

/// Accounts held in process memory, keyed by normalised email.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<String, StoredAccount>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<StoredAccount>> {
        Ok(self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(email)
            .cloned())
    }

    async fn insert(&self, account: StoredAccount) -> StoreResult<()> {
        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let email = account.identity.email.clone();
        if accounts.contains_key(&email) {
            return Err(StoreError::AlreadyExists(format!("Account {email}")));
        }
        accounts.insert(email, account);
        Ok(())
    }

    async fn count(&self) -> StoreResult<u64> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.len() as u64)
    }
}
