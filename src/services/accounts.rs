//! Trusted account provisioning.
//!
//! Used by administrators over HTTP and by operators through the CLI.
//! Students get an account only; they complete their profile on first
//! sign-in. Administrators get an approved profile straight away, except
//! the bootstrap administrator, whose profile is provisioned on sign-in.

use secrecy::SecretString;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::is_bootstrap_admin;
use crate::error::{SessionError, StoreError};
use crate::identity::AccountDirectory;
use crate::models::{Identity, NewProfile, Profile, Role};
use crate::store::ProfileStore;

/// A freshly created account and the profile written for it, if any.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedAccount {
    pub identity: Identity,
    pub role: Role,
    pub profile: Option<Profile>,
}

/// Register an account for someone else, without signing it in anywhere.
pub async fn create_account(
    directory: &AccountDirectory,
    profiles: &dyn ProfileStore,
    email: &str,
    password: &SecretString,
    role: Role,
) -> Result<ProvisionedAccount, SessionError> {
    let identity = directory.register(email, password).await?;

    let profile = if role == Role::Admin && !is_bootstrap_admin(&identity.email) {
        match profiles.create(&identity.id, NewProfile::admin()).await {
            Ok(profile) => Some(profile),
            Err(StoreError::AlreadyExists(_)) => profiles
                .get(&identity.id)
                .await
                .map_err(SessionError::ProfileWrite)?,
            Err(err) => {
                warn!(
                    identity_id = %identity.id,
                    error = %err,
                    "Account created but administrator profile write failed"
                );
                return Err(SessionError::ProfileWrite(err));
            }
        }
    } else {
        None
    };

    info!(identity_id = %identity.id, role = %role, "Account created");
    Ok(ProvisionedAccount {
        identity,
        role,
        profile,
    })
}
