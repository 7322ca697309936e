//! Scripted collaborators for exercising the session manager without a network
//!
//! Each operation follows a [`MockBehavior`] that tests can change between
//! calls. Call counters let tests assert which steps actually ran.

use crate::backend::{ActiveSession, AuthBackend, SessionStore};
use crate::identity::{BeginSignInRequest, IdentityProviderClient};
use crate::models::auth::AuthError;
use crate::models::{
    FederatedCredential, Principal, ProviderCredential, SignInIntent, SignInPayload,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::constants::TEST_PROVIDER_ID;
use super::fixtures::TestFixtures;

/// How a mocked operation responds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    Succeed,
    /// Fail with a non-cancellation error carrying this message
    Fail(String),
    /// Report that the user or system aborted the operation
    Cancel,
    /// Never complete; only the caller's cancellation ends the call
    Hang,
}

impl MockBehavior {
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        MockBehavior::Fail(message.into())
    }

    /// Resolve the scripted outcome; `Ok(())` means the caller should succeed
    async fn play(&self, error: fn(String) -> AuthError) -> Result<(), AuthError> {
        match self {
            MockBehavior::Succeed => Ok(()),
            MockBehavior::Fail(message) => Err(error(message.clone())),
            MockBehavior::Cancel => Err(AuthError::Cancelled("aborted by mock".to_string())),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}

fn read(behavior: &Mutex<MockBehavior>) -> MockBehavior {
    behavior
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn write(behavior: &Mutex<MockBehavior>, next: MockBehavior) {
    *behavior.lock().unwrap_or_else(PoisonError::into_inner) = next;
}

// =============================================================================
// Identity provider
// =============================================================================

pub struct MockIdentityProvider {
    begin: Mutex<MockBehavior>,
    credential: Mutex<MockBehavior>,
    sign_out: Mutex<MockBehavior>,
    yields: Mutex<ProviderCredential>,
    begin_calls: AtomicUsize,
    credential_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self {
            begin: Mutex::new(MockBehavior::Succeed),
            credential: Mutex::new(MockBehavior::Succeed),
            sign_out: Mutex::new(MockBehavior::Succeed),
            yields: Mutex::new(TestFixtures::provider_credential()),
            begin_calls: AtomicUsize::new(0),
            credential_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }
}

impl MockIdentityProvider {
    /// A provider on which every operation succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_begin(self, behavior: MockBehavior) -> Self {
        write(&self.begin, behavior);
        self
    }

    #[must_use]
    pub fn with_credential_behavior(self, behavior: MockBehavior) -> Self {
        write(&self.credential, behavior);
        self
    }

    #[must_use]
    pub fn with_sign_out(self, behavior: MockBehavior) -> Self {
        write(&self.sign_out, behavior);
        self
    }

    /// Credential yielded by a successful `credential_from_result`
    #[must_use]
    pub fn with_credential(self, credential: ProviderCredential) -> Self {
        *self.yields.lock().unwrap_or_else(PoisonError::into_inner) = credential;
        self
    }

    pub fn set_begin(&self, behavior: MockBehavior) {
        write(&self.begin, behavior);
    }

    #[must_use]
    pub fn begin_calls(&self) -> usize {
        self.begin_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn credential_calls(&self) -> usize {
        self.credential_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProviderClient for MockIdentityProvider {
    async fn begin_sign_in(&self, request: &BeginSignInRequest) -> Result<SignInIntent, AuthError> {
        self.begin_calls.fetch_add(1, Ordering::SeqCst);
        read(&self.begin).play(AuthError::Provider).await?;

        let calls = self.begin_calls();
        Ok(SignInIntent {
            url: format!(
                "https://accounts.example.com/o/oauth2/auth?client_id={}&state=state-{calls}",
                request.id_token_options.server_client_id
            ),
            state: format!("state-{calls}"),
        })
    }

    async fn credential_from_result(
        &self,
        _payload: &SignInPayload,
    ) -> Result<ProviderCredential, AuthError> {
        self.credential_calls.fetch_add(1, Ordering::SeqCst);
        read(&self.credential).play(AuthError::Provider).await?;
        Ok(self.yields.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        read(&self.sign_out).play(AuthError::Provider).await
    }

    fn provider_id(&self) -> &str {
        TEST_PROVIDER_ID
    }
}

// =============================================================================
// Auth backend
// =============================================================================

/// Backend that keeps its session in a real [`SessionStore`]
pub struct MockAuthBackend {
    store: SessionStore,
    principal: Principal,
    exchange: Mutex<MockBehavior>,
    token: Mutex<MockBehavior>,
    sign_out: Mutex<MockBehavior>,
    token_delay: Option<std::time::Duration>,
    exchange_calls: AtomicUsize,
    token_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
    exchanged: Mutex<Vec<FederatedCredential>>,
}

impl Default for MockAuthBackend {
    fn default() -> Self {
        Self {
            store: SessionStore::new(),
            principal: TestFixtures::principal(),
            exchange: Mutex::new(MockBehavior::Succeed),
            token: Mutex::new(MockBehavior::Succeed),
            sign_out: Mutex::new(MockBehavior::Succeed),
            token_delay: None,
            exchange_calls: AtomicUsize::new(0),
            token_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            exchanged: Mutex::new(Vec::new()),
        }
    }
}

impl MockAuthBackend {
    /// A signed-out backend on which every operation succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that already holds a session for the default principal
    #[must_use]
    pub fn signed_in() -> Self {
        let backend = Self::default();
        backend.store.establish(TestFixtures::active_session());
        backend
    }

    /// Principal established by a successful exchange
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = principal;
        self
    }

    #[must_use]
    pub fn with_exchange(self, behavior: MockBehavior) -> Self {
        write(&self.exchange, behavior);
        self
    }

    #[must_use]
    pub fn with_token(self, behavior: MockBehavior) -> Self {
        write(&self.token, behavior);
        self
    }

    #[must_use]
    pub fn with_sign_out(self, behavior: MockBehavior) -> Self {
        write(&self.sign_out, behavior);
        self
    }

    /// Delay every successful token fetch
    #[must_use]
    pub fn with_token_delay(mut self, delay: std::time::Duration) -> Self {
        self.token_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Credentials received by `exchange_credential`, oldest first
    #[must_use]
    pub fn exchanged(&self) -> Vec<FederatedCredential> {
        self.exchanged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    async fn exchange_credential(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Principal, AuthError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.exchanged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(credential.clone());
        read(&self.exchange).play(AuthError::Backend).await?;

        self.store.establish(ActiveSession {
            principal: self.principal.clone(),
            id_token: "mock-token-0".to_string(),
            refresh_token: Some("mock-refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        });
        Ok(self.principal.clone())
    }

    fn current_principal(&self) -> Option<Principal> {
        self.store.principal()
    }

    async fn get_token(
        &self,
        principal: &Principal,
        _force_refresh: bool,
    ) -> Result<String, AuthError> {
        let call = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        read(&self.token).play(AuthError::Backend).await?;

        if let Some(delay) = self.token_delay {
            tokio::time::sleep(delay).await;
        }

        let token = format!("mock-token-{call}");
        if self.store.update_tokens(
            &principal.uid,
            token.clone(),
            None,
            Utc::now() + Duration::hours(1),
        ) {
            Ok(token)
        } else {
            Err(AuthError::Backend(format!(
                "User {} is no longer signed in",
                principal.uid
            )))
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        read(&self.sign_out).play(AuthError::Backend).await?;
        self.store.clear();
        Ok(())
    }
}
