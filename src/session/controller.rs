//! Auth/profile reconciliation controller.
//!
//! Owns the session state for one client. State changes come only from
//! identity-change notifications and from completed profile reads and
//! writes. Every asynchronous continuation checks the liveness flag and the
//! generation counter before touching state, so a stale fetch (older
//! identity event, logout, teardown) never lands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::events::{Navigation, Notice, SessionEvents};
use super::state::{SessionSnapshot, SessionState};
use crate::config::{SessionSettings, is_bootstrap_admin};
use crate::error::{SessionError, StoreError, StoreResult};
use crate::identity::IdentityProvider;
use crate::models::{
    ApprovalStatus, Identity, IdentityId, NewProfile, Profile, ProfileFields, ProfileUpdate, Role,
};
use crate::store::ProfileStore;

/// Result of a login call.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub notice: Notice,
    pub navigation: Option<Navigation>,
    pub snapshot: SessionSnapshot,
}

/// Credentials and profile data for a sign-up.
#[derive(Debug)]
pub struct SignUpRequest {
    pub email: String,
    pub password: SecretString,
    pub role: Role,
    pub fields: ProfileFields,
}

/// Result of a successful sign-up.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
    pub identity: Identity,
    pub profile: Profile,
    pub notice: Notice,
}

/// Outcome of a profile lookup for one identity.
#[derive(Debug, Clone)]
struct Resolution {
    profile: Option<Profile>,
    fetch_failed: bool,
}

impl Resolution {
    fn found(profile: Option<Profile>) -> Self {
        Self {
            profile,
            fetch_failed: false,
        }
    }

    fn failed() -> Self {
        Self {
            profile: None,
            fetch_failed: true,
        }
    }
}

struct Inner {
    state: SessionState,
    /// Bumped by every identity event and every direct commit
    generation: u64,
    prompt_dismissed: bool,
    fetch_failed: bool,
}

struct Shared {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    settings: SessionSettings,
    events: SessionEvents,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionSnapshot>,
    alive: AtomicBool,
    /// Wakes `settled` waiters on stop
    stopped: Notify,
    listener: Mutex<Option<JoinHandle<()>>>,
    /// Serialises bootstrap-admin provisioning
    provisioning: tokio::sync::Mutex<()>,
}

/// Single-writer owner of one client's session state.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        settings: SessionSettings,
    ) -> Self {
        let state = SessionState::Loading { identity: None };
        let (state_tx, _) = watch::channel(SessionSnapshot::from_state(&state, false, false));

        Self {
            shared: Arc::new(Shared {
                identity,
                profiles,
                settings,
                events: SessionEvents::new(),
                inner: Mutex::new(Inner {
                    state,
                    generation: 0,
                    prompt_dismissed: false,
                    fetch_failed: false,
                }),
                state_tx,
                alive: AtomicBool::new(true),
                stopped: Notify::new(),
                listener: Mutex::new(None),
                provisioning: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Register the identity listener. Only the first call has any effect.
    pub fn start(&self) {
        let mut listener = self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if listener.is_some() {
            warn!("Session controller already started");
            return;
        }
        if !self.shared.is_alive() {
            warn!("Session controller was stopped and cannot be restarted");
            return;
        }

        let mut subscription = self.shared.identity.subscribe();
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);

        *listener = Some(tokio::spawn(async move {
            while let Some(change) = subscription.next().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                if !shared.is_alive() {
                    break;
                }
                Shared::on_identity_change(&shared, change);
            }
            debug!("Identity listener finished");
        }));

        debug!("Session controller started");
    }

    /// Unsubscribe from identity changes and discard any in-flight results.
    pub fn stop(&self) {
        if !self.shared.alive.swap(false, Ordering::SeqCst) {
            return;
        }

        let handle = self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        self.shared.stopped.notify_waiters();

        info!("Session controller stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_alive()
    }

    /// Current consumer-facing state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state_tx.borrow().clone()
    }

    /// Observe state changes.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.state_tx.subscribe()
    }

    /// Notices and navigation signals.
    pub fn events(&self) -> &SessionEvents {
        &self.shared.events
    }

    pub fn identity(&self) -> Option<Identity> {
        self.snapshot().identity
    }

    pub fn profile(&self) -> Option<Profile> {
        self.snapshot().profile
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot().is_loading
    }

    pub fn needs_profile_creation(&self) -> bool {
        self.snapshot().needs_profile_creation
    }

    /// Wait until no profile fetch is in flight, or the controller is stopped.
    ///
    /// Yields first so queued identity events get processed. A stopped
    /// controller answers at once with the state frozen at teardown.
    pub async fn settled(&self) -> SessionSnapshot {
        tokio::task::yield_now().await;

        let stopped = self.shared.stopped.notified();
        tokio::pin!(stopped);
        stopped.as_mut().enable();
        if !self.shared.is_alive() {
            return self.snapshot();
        }

        let mut rx = self.watch();
        tokio::select! {
            result = rx.wait_for(|snapshot| !snapshot.is_loading) => match result {
                Ok(snapshot) => snapshot.clone(),
                // The sender lives as long as the controller
                Err(_) => self.snapshot(),
            },
            _ = &mut stopped => self.snapshot(),
        }
    }

    /// Sign in and route by the stored profile.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
        expected_role: Role,
    ) -> Result<LoginOutcome, SessionError> {
        self.shared.ensure_alive()?;

        let identity = match self.shared.identity.sign_in(email, password).await {
            Ok(identity) => identity,
            Err(err) => {
                info!(code = %err.code, "Sign-in rejected");
                self.shared.events.notify(Notice::error(err.message.clone()));
                return Err(err.into());
            }
        };

        let resolution = self.shared.resolve_profile(&identity).await;
        if !self.shared.commit_for_identity(&identity, &resolution) {
            info!(identity_id = %identity.id, "Login superseded before it resolved");
            self.shared.ensure_alive()?;
            return Err(SessionError::NotAuthenticated);
        }

        let (notice, navigation) = login_decision(expected_role, &resolution);
        info!(
            identity_id = %identity.id,
            expected_role = %expected_role,
            navigation = ?navigation,
            "Login resolved"
        );

        self.shared.events.notify(notice.clone());
        if let Some(target) = navigation {
            self.shared.events.navigate(target);
        }

        Ok(LoginOutcome {
            identity,
            notice,
            navigation,
            snapshot: self.snapshot(),
        })
    }

    /// Self-service sign-up. Only administrator accounts may be created
    /// this way; students sign in and complete the profile form.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, SessionError> {
        if request.role == Role::Student {
            self.shared.events.notify(Notice::warning(
                "Students cannot sign up here. Sign in and complete your profile instead.",
            ));
            return Err(SessionError::StudentSignUpRejected);
        }

        let (identity, profile) = self
            .provision_account(request.role, &request.email, &request.password, request.fields)
            .await?;

        let notice = Notice::success("Administrator account created");
        self.shared.events.notify(notice.clone());

        Ok(SignUpOutcome {
            identity,
            profile,
            notice,
        })
    }

    /// Create an identity and its profile, identity first.
    ///
    /// If the profile write fails the identity is left without a profile;
    /// the next login takes the no-profile path.
    pub async fn provision_account(
        &self,
        role: Role,
        email: &str,
        password: &SecretString,
        fields: ProfileFields,
    ) -> Result<(Identity, Profile), SessionError> {
        self.shared.ensure_alive()?;

        let identity = match self.shared.identity.sign_up(email, password).await {
            Ok(identity) => identity,
            Err(err) => {
                info!(code = %err.code, "Sign-up rejected");
                self.shared.events.notify(Notice::error(err.message.clone()));
                return Err(err.into());
            }
        };

        let new_profile = match role {
            Role::Admin => NewProfile {
                role: Role::Admin,
                status: ApprovalStatus::Approved,
                fields: fields.normalized(),
            },
            Role::Student => NewProfile::pending_student(fields.normalized()),
        };

        match self.shared.profiles.create(&identity.id, new_profile).await {
            Ok(_) => {}
            Err(StoreError::AlreadyExists(_)) => {
                info!(identity_id = %identity.id, "Profile already provisioned, using stored copy");
            }
            Err(err) => {
                warn!(
                    identity_id = %identity.id,
                    error = %err,
                    "Identity created but profile write failed"
                );
                self.shared
                    .events
                    .notify(Notice::error("Account created, but saving the profile failed"));
                return Err(SessionError::ProfileWrite(err));
            }
        }

        let profile = self.shared.reread_profile(&identity.id).await?;
        // The account exists whether or not this session still shows it
        let _ = self
            .shared
            .commit_for_identity(&identity, &Resolution::found(Some(profile.clone())));

        info!(identity_id = %identity.id, role = %profile.role, "Account provisioned");
        Ok((identity, profile))
    }

    /// Sign out and clear all session state. After stop only the identity
    /// provider is signed out.
    pub async fn logout(&self) {
        self.shared.identity.sign_out().await;

        let mut inner = self.shared.lock();
        if !self.shared.is_alive() {
            debug!("Signed out after stop, session state left as is");
            return;
        }
        inner.generation += 1;
        inner.state = SessionState::Unauthenticated;
        inner.prompt_dismissed = false;
        inner.fetch_failed = false;
        self.shared.publish(&inner);
        drop(inner);

        info!("Logged out");
    }

    /// Submit profile fields for the signed-in identity. A student's stored
    /// status becomes pending whatever it was before; an administrator's
    /// profile keeps its status.
    pub async fn create_profile(&self, fields: ProfileFields) -> Result<Profile, SessionError> {
        self.shared.ensure_alive()?;

        let identity = self
            .shared
            .identity
            .current()
            .ok_or(SessionError::NotAuthenticated)?;
        let fields = fields.normalized();

        let cached = {
            let inner = self.shared.lock();
            inner
                .state
                .profile()
                .filter(|profile| profile.id == identity.id)
                .cloned()
        };

        let written = match cached {
            Some(existing) => {
                self.shared
                    .profiles
                    .update(&identity.id, submission(fields, Some(&existing)))
                    .await
            }
            None => {
                match self
                    .shared
                    .profiles
                    .create(&identity.id, NewProfile::pending_student(fields.clone()))
                    .await
                {
                    Err(StoreError::AlreadyExists(_)) => {
                        debug!(identity_id = %identity.id, "Profile appeared concurrently, updating instead");
                        match self.shared.profiles.get(&identity.id).await {
                            Ok(stored) => {
                                self.shared
                                    .profiles
                                    .update(&identity.id, submission(fields, stored.as_ref()))
                                    .await
                            }
                            Err(err) => Err(err),
                        }
                    }
                    other => other,
                }
            }
        };

        if let Err(err) = written {
            warn!(identity_id = %identity.id, error = %err, "Profile write failed");
            self.shared
                .events
                .notify(Notice::error("Could not save your profile. Please try again."));
            return Err(SessionError::ProfileWrite(err));
        }

        // Trust the store, not the local copy
        let profile = self.shared.reread_profile(&identity.id).await?;
        let landed = self
            .shared
            .commit_for_identity(&identity, &Resolution::found(Some(profile.clone())));

        if landed {
            let notice = if profile.is_admin() {
                Notice::success("Profile updated")
            } else {
                Notice::success("Profile submitted. An administrator will review it shortly.")
            };
            self.shared.events.notify(notice);
        }
        info!(identity_id = %identity.id, role = %profile.role, "Profile submitted");
        Ok(profile)
    }

    /// Hide the profile-creation prompt until the next identity change.
    pub fn close_profile_creation_modal(&self) {
        let mut inner = self.shared.lock();
        if !self.shared.is_alive() {
            return;
        }
        inner.prompt_dismissed = true;
        self.shared.publish(&inner);
    }
}

/// Update for a profile-form submission. Students go back to pending;
/// administrators are not subject to approval.
fn submission(fields: ProfileFields, existing: Option<&Profile>) -> ProfileUpdate {
    let status = match existing {
        Some(profile) if profile.is_admin() => None,
        _ => Some(ApprovalStatus::Pending),
    };
    ProfileUpdate { status, fields }
}

/// Notice and navigation for a login, by expected role and stored profile.
fn login_decision(expected_role: Role, resolution: &Resolution) -> (Notice, Option<Navigation>) {
    match &resolution.profile {
        None if resolution.fetch_failed => (
            Notice::warning("We could not load your profile. Complete the profile form or try again later."),
            None,
        ),
        None => match expected_role {
            Role::Student => (
                Notice::info("Please complete your profile to continue"),
                None,
            ),
            Role::Admin => (
                Notice::warning("No administrator profile exists for this account"),
                None,
            ),
        },
        Some(profile) if profile.is_admin() => (
            Notice::success("Welcome back, administrator"),
            Some(Navigation::AdminDashboard),
        ),
        Some(profile) => match profile.status {
            ApprovalStatus::Approved => (
                Notice::success("Login successful"),
                Some(Navigation::StudentDashboard),
            ),
            ApprovalStatus::Pending => (
                Notice::warning("Your profile is pending admin approval"),
                Some(Navigation::Home),
            ),
            ApprovalStatus::Rejected => (
                Notice::error("Your profile was not approved. Contact the department office."),
                Some(Navigation::Home),
            ),
        },
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn ensure_alive(&self) -> Result<(), SessionError> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(SessionError::Stopped)
        }
    }

    fn publish(&self, inner: &Inner) {
        self.state_tx.send_replace(SessionSnapshot::from_state(
            &inner.state,
            inner.prompt_dismissed,
            inner.fetch_failed,
        ));
    }

    /// Identity listener callback: enter Loading (or Unauthenticated) and
    /// start the profile fetch for this event.
    fn on_identity_change(shared: &Arc<Shared>, change: Option<Identity>) {
        let generation = {
            let mut inner = shared.lock();
            // A direct operation already resolved this identity
            if let Some(identity) = &change
                && !inner.state.is_loading()
                && !inner.fetch_failed
                && inner.state.identity().map(|current| &current.id) == Some(&identity.id)
            {
                debug!(identity_id = %identity.id, "Identity already resolved, skipping fetch");
                return;
            }
            inner.generation += 1;
            inner.prompt_dismissed = false;
            inner.fetch_failed = false;
            inner.state = match &change {
                None => SessionState::Unauthenticated,
                Some(identity) => SessionState::Loading {
                    identity: Some(identity.clone()),
                },
            };
            shared.publish(&inner);
            inner.generation
        };

        let Some(identity) = change else {
            debug!("Identity cleared");
            return;
        };

        debug!(identity_id = %identity.id, generation, "Identity changed, fetching profile");
        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            let resolution = shared.resolve_profile(&identity).await;
            shared.commit_if_current(generation, identity, &resolution);
        });
    }

    /// Land a listener-initiated fetch unless something newer has happened.
    fn commit_if_current(&self, generation: u64, identity: Identity, resolution: &Resolution) {
        let mut inner = self.lock();
        if !self.is_alive() || inner.generation != generation {
            debug!(
                identity_id = %identity.id,
                generation,
                current = inner.generation,
                "Discarding stale profile fetch"
            );
            return;
        }
        inner.state = SessionState::resolved(identity, resolution.profile.clone());
        inner.fetch_failed = resolution.fetch_failed;
        self.publish(&inner);
    }

    /// Land the result of a direct operation, provided the identity it was
    /// made for is still the signed-in one. Supersedes in-flight fetches.
    /// Returns whether the result landed.
    #[must_use]
    fn commit_for_identity(&self, identity: &Identity, resolution: &Resolution) -> bool {
        let mut inner = self.lock();
        if !self.is_alive() {
            return false;
        }
        if self.identity.current().as_ref().map(|current| &current.id) != Some(&identity.id) {
            debug!(identity_id = %identity.id, "Identity changed underneath, not committing");
            return false;
        }

        if inner.state.identity().map(|current| &current.id) != Some(&identity.id) {
            inner.prompt_dismissed = false;
        }
        inner.generation += 1;
        inner.state = SessionState::resolved(identity.clone(), resolution.profile.clone());
        inner.fetch_failed = resolution.fetch_failed;
        self.publish(&inner);
        true
    }

    /// Read the profile, retrying transient failures with linear backoff.
    async fn fetch_profile(&self, id: &IdentityId) -> StoreResult<Option<Profile>> {
        let mut attempt: u32 = 0;
        loop {
            match self.profiles.get(id).await {
                Ok(profile) => return Ok(profile),
                Err(err) if err.is_transient() && attempt < self.settings.fetch_retries => {
                    attempt += 1;
                    warn!(identity_id = %id, attempt, error = %err, "Profile fetch failed, retrying");
                    tokio::time::sleep(self.settings.fetch_backoff * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Load the profile for an identity, provisioning the bootstrap
    /// administrator when needed. Read failures count as "no profile".
    async fn resolve_profile(&self, identity: &Identity) -> Resolution {
        match self.fetch_profile(&identity.id).await {
            Ok(Some(profile)) => Resolution::found(Some(profile)),
            Ok(None) if is_bootstrap_admin(&identity.email) => self.bootstrap_admin(identity).await,
            Ok(None) => Resolution::found(None),
            Err(err) => {
                warn!(
                    identity_id = %identity.id,
                    error = %err,
                    "Profile fetch failed, treating profile as absent"
                );
                Resolution::failed()
            }
        }
    }

    async fn bootstrap_admin(&self, identity: &Identity) -> Resolution {
        let _guard = self.provisioning.lock().await;

        // Another resolution may have provisioned while we waited
        match self.fetch_profile(&identity.id).await {
            Ok(Some(profile)) => return Resolution::found(Some(profile)),
            Ok(None) => {}
            Err(err) => {
                warn!(identity_id = %identity.id, error = %err, "Profile fetch failed before bootstrap");
                return Resolution::failed();
            }
        }

        info!(identity_id = %identity.id, "Provisioning bootstrap administrator profile");
        match self.profiles.create(&identity.id, NewProfile::admin()).await {
            Ok(_) | Err(StoreError::AlreadyExists(_)) => {}
            Err(err) => {
                error!(identity_id = %identity.id, error = %err, "Bootstrap administrator provisioning failed");
                self.events
                    .notify(Notice::error("Administrator provisioning failed. Try signing in again."));
                return Resolution::found(None);
            }
        }

        match self.fetch_profile(&identity.id).await {
            Ok(profile) => Resolution::found(profile),
            Err(err) => {
                warn!(identity_id = %identity.id, error = %err, "Profile refetch after bootstrap failed");
                Resolution::failed()
            }
        }
    }

    /// Re-read a profile right after writing it.
    async fn reread_profile(&self, id: &IdentityId) -> Result<Profile, SessionError> {
        match self.fetch_profile(id).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Err(SessionError::ProfileWrite(StoreError::NotFound(format!(
                "Profile {id}"
            )))),
            Err(err) => Err(SessionError::ProfileWrite(err)),
        }
    }
}
