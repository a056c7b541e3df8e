//! Session state machine values and the snapshot handed to consumers.

use serde::Serialize;

use crate::config::is_bootstrap_admin;
use crate::models::{Identity, Profile};

/// Who is logged in and what profile they have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    /// Profile fetch in flight; the identity may not be known yet.
    Loading { identity: Option<Identity> },
    /// Signed in, no profile on record.
    AuthenticatedNoProfile { identity: Identity },
    AuthenticatedWithProfile { identity: Identity, profile: Profile },
}

impl SessionState {
    /// Settled state for a completed profile lookup.
    pub fn resolved(identity: Identity, profile: Option<Profile>) -> Self {
        match profile {
            Some(profile) => Self::AuthenticatedWithProfile { identity, profile },
            None => Self::AuthenticatedNoProfile { identity },
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Unauthenticated => None,
            Self::Loading { identity } => identity.as_ref(),
            Self::AuthenticatedNoProfile { identity } => Some(identity),
            Self::AuthenticatedWithProfile { identity, .. } => Some(identity),
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::AuthenticatedWithProfile { profile, .. } => Some(profile),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// Signed in without a profile, and not the bootstrap administrator.
    pub fn needs_profile_creation(&self) -> bool {
        match self {
            Self::AuthenticatedNoProfile { identity } => !is_bootstrap_admin(&identity.email),
            _ => false,
        }
    }
}

/// Read-only view of the session for the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub is_loading: bool,
    pub needs_profile_creation: bool,
    /// Needs creation and the prompt has not been dismissed this cycle
    pub show_profile_prompt: bool,
    /// The last profile read failed and the profile was assumed absent
    pub profile_fetch_failed: bool,
}

impl SessionSnapshot {
    pub fn from_state(state: &SessionState, prompt_dismissed: bool, fetch_failed: bool) -> Self {
        let needs_profile_creation = state.needs_profile_creation();
        Self {
            identity: state.identity().cloned(),
            profile: state.profile().cloned(),
            is_loading: state.is_loading(),
            needs_profile_creation,
            show_profile_prompt: needs_profile_creation && !prompt_dismissed,
            profile_fetch_failed: fetch_failed && state.profile().is_none(),
        }
    }
}
