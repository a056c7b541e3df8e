//! Shared helpers for session controller tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dept_portal_lib::config::SessionSettings;
use dept_portal_lib::identity::{AccountDirectory, IdentityProvider, LocalIdentityProvider};
use dept_portal_lib::models::{
    ApprovalStatus, Identity, IdentityId, NewProfile, Profile, ProfileFields, ProfileUpdate,
};
use dept_portal_lib::session::{SessionController, SessionEvent};
use dept_portal_lib::store::{InMemoryProfileStore, ProfileStore, StoreError, StoreResult};
use secrecy::SecretString;
use tokio::sync::{Notify, broadcast};

pub const PASSWORD: &str = "pw123456";

pub fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

/// In-memory store with failure injection, per-identity gates and call counters.
#[derive(Default)]
pub struct TestStore {
    inner: InMemoryProfileStore,
    get_failures: AtomicU32,
    fail_writes: AtomicBool,
    gates: Mutex<HashMap<IdentityId, Arc<Notify>>>,
    entered: Notify,
    pub gets: AtomicU32,
    pub creates: AtomicU32,
    pub updates: AtomicU32,
}

impl TestStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `n` reads fail with a transient error.
    pub fn fail_next_gets(&self, n: u32) {
        self.get_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Hold reads for `id` until [`TestStore::release`] is called.
    pub fn gate(&self, id: &IdentityId) {
        self.gates
            .lock()
            .unwrap()
            .insert(id.clone(), Arc::new(Notify::new()));
    }

    pub fn release(&self, id: &IdentityId) {
        if let Some(gate) = self.gates.lock().unwrap().remove(id) {
            gate.notify_waiters();
        }
    }

    /// Wait until a gated read has started.
    pub async fn wait_entered(&self) {
        tokio::time::timeout(Duration::from_secs(2), self.entered.notified())
            .await
            .expect("gated read never started");
    }

    pub fn profile_count(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl ProfileStore for TestStore {
    async fn get(&self, id: &IdentityId) -> StoreResult<Option<Profile>> {
        self.gets.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().unwrap().get(id).cloned();
        if let Some(gate) = gate {
            let released = gate.notified();
            tokio::pin!(released);
            released.as_mut().enable();
            self.entered.notify_one();
            released.await;
        }

        let remaining = self.get_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.get_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }

        self.inner.get(id).await
    }

    async fn create(&self, id: &IdentityId, profile: NewProfile) -> StoreResult<Profile> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        self.inner.create(id, profile).await
    }

    async fn update(&self, id: &IdentityId, update: ProfileUpdate) -> StoreResult<Profile> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        self.inner.update(id, update).await
    }

    async fn list_by_status(&self, status: ApprovalStatus) -> StoreResult<Vec<Profile>> {
        self.inner.list_by_status(status).await
    }
}

/// A started controller with direct access to its collaborators.
pub struct Harness {
    pub directory: Arc<AccountDirectory>,
    pub provider: Arc<LocalIdentityProvider>,
    pub store: Arc<TestStore>,
    pub controller: SessionController,
}

impl Harness {
    pub async fn start() -> Self {
        let directory = Arc::new(AccountDirectory::new());
        let provider = Arc::new(LocalIdentityProvider::new(Arc::clone(&directory)));
        let store = TestStore::new();
        let controller = SessionController::new(
            provider.clone(),
            store.clone(),
            SessionSettings {
                fetch_retries: 2,
                fetch_backoff: Duration::from_millis(1),
            },
        );
        controller.start();
        controller.settled().await;

        Self {
            directory,
            provider,
            store,
            controller,
        }
    }

    /// Register an account without signing in.
    pub async fn register(&self, email: &str) -> Identity {
        self.directory
            .register(email, &secret(PASSWORD))
            .await
            .expect("register account")
    }

    /// Register an account and store a profile for it.
    pub async fn register_with_profile(&self, email: &str, profile: NewProfile) -> Identity {
        let identity = self.register(email).await;
        self.store
            .create(&identity.id, profile)
            .await
            .expect("seed profile");
        identity
    }

    /// Sign in through the provider only, as another tab would.
    pub async fn sign_in_externally(&self, email: &str) -> Identity {
        self.provider
            .sign_in(email, &secret(PASSWORD))
            .await
            .expect("sign in")
    }

    /// Let spawned continuations run to completion.
    pub async fn drain(&self) {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub fn student_fields() -> ProfileFields {
    ProfileFields {
        ht_no: Some("20A1".to_string()),
        student_name: Some("Jane".to_string()),
        year: Some("2".to_string()),
        ..ProfileFields::default()
    }
}

pub fn approved_student() -> NewProfile {
    NewProfile {
        status: ApprovalStatus::Approved,
        ..NewProfile::pending_student(student_fields())
    }
}

/// Collect every event already sent.
pub fn drain_events(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
