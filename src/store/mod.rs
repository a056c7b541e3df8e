//! Profile and account store boundaries.
//!
//! One profile per identity, keyed by the identity id. A missing profile is
//! reported as `Ok(None)`, not as an error. Accounts are keyed by
//! normalised email and hold the credential digest behind an identity.

pub mod database;
pub mod memory;

use async_trait::async_trait;

pub use crate::error::{StoreError, StoreResult};
use crate::models::{ApprovalStatus, IdentityId, NewProfile, Profile, ProfileUpdate, StoredAccount};

pub use database::{DatabaseAccountStore, DatabaseProfileStore};
pub use memory::{InMemoryAccountStore, InMemoryProfileStore};

/// Profile persistence.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Get the profile for an identity, `None` if it has none yet.
    async fn get(&self, id: &IdentityId) -> StoreResult<Option<Profile>>;

    /// Create a profile. Fails with [`StoreError::AlreadyExists`] if one exists.
    async fn create(&self, id: &IdentityId, profile: NewProfile) -> StoreResult<Profile>;

    /// Write the set parts of `update`. Fails with [`StoreError::NotFound`] if absent.
    async fn update(&self, id: &IdentityId, update: ProfileUpdate) -> StoreResult<Profile>;

    /// Profiles with the given approval status, oldest first.
    async fn list_by_status(&self, status: ApprovalStatus) -> StoreResult<Vec<Profile>>;

    /// Set the approval status of a profile.
    async fn set_status(&self, id: &IdentityId, status: ApprovalStatus) -> StoreResult<Profile> {
        self.update(
            id,
            ProfileUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Check the backend is reachable.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Account persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up an account by normalised email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<StoredAccount>>;

    /// Store a new account. Fails with [`StoreError::AlreadyExists`] if the email is taken.
    async fn insert(&self, account: StoredAccount) -> StoreResult<()>;

    /// Number of registered accounts.
    async fn count(&self) -> StoreResult<u64>;
}
