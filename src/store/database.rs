//! Profile and account stores backed by the relational database.

use async_trait::async_trait;

use super::{AccountStore, ProfileStore, StoreResult};
use crate::db::{DbPool, accounts, profiles};
use crate::models::{ApprovalStatus, IdentityId, NewProfile, Profile, ProfileUpdate, StoredAccount};

/// SeaORM-backed profile store.
#[derive(Clone)]
pub struct DatabaseProfileStore {
    pool: DbPool,
}

impl DatabaseProfileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for DatabaseProfileStore {
    async fn get(&self, id: &IdentityId) -> StoreResult<Option<Profile>> {
        profiles::find_by_id(self.pool.connection(), id).await
    }

    async fn create(&self, id: &IdentityId, profile: NewProfile) -> StoreResult<Profile> {
        profiles::insert(self.pool.connection(), id, profile).await
    }

    async fn update(&self, id: &IdentityId, update: ProfileUpdate) -> StoreResult<Profile> {
        profiles::update(self.pool.connection(), id, update).await
    }

    async fn list_by_status(&self, status: ApprovalStatus) -> StoreResult<Vec<Profile>> {
        profiles::list_by_status(self.pool.connection(), status).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.pool.connection().ping().await?;
        Ok(())
    }
}

/// SeaORM-backed account store.
#[derive(Clone)]
pub struct DatabaseAccountStore {
    pool: DbPool,
}

impl DatabaseAccountStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for DatabaseAccountStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<StoredAccount>> {
        accounts::find_by_email(self.pool.connection(), email).await
    }

    async fn insert(&self, account: StoredAccount) -> StoreResult<()> {
        accounts::insert(self.pool.connection(), account).await
    }

    async fn count(&self) -> StoreResult<u64> {
        accounts::count(self.pool.connection()).await
    }
}
