//! Session Manager - Federated Sign-In Orchestration
//!
//! The `SessionManager` drives the three-step handshake between the UI layer,
//! the identity provider and the auth backend:
//!
//! 1. [`SessionManager::begin_sign_in`] asks the provider for an intent the UI
//!    displays as an account picker.
//! 2. [`SessionManager::complete_sign_in`] turns the picker payload into a
//!    provider credential, exchanges its ID token with the backend and fetches
//!    a fresh session token.
//! 3. [`SessionManager::get_signed_in_user`] and [`SessionManager::sign_out`]
//!    query and end the ambient session.
//!
//! Every suspension point races the caller's [`CancellationToken`].
//! Cancellation is returned as [`Cancelled`]; every other failure is folded
//! into a [`SignInResult`], an absent value, or a [`SignOutReport`].
//!
//! Only one begin/complete operation runs at a time per manager; overlapping
//! calls are rejected instead of being queued.

use crate::backend::{AuthBackend, FirebaseAuthBackend, SessionStore};
use crate::identity::{BeginSignInRequest, GoogleIdentityClient, IdentityProviderClient};
use crate::models::auth::{AuthError, Cancelled, SignOutError, SignOutReport};
use crate::models::{
    FederatedCredential, SignInIntent, SignInPayload, SignInResult, TokenHandle, UserData,
};
use crate::session::state::{FlightControl, SessionState};
use crate::settings::SignInSettings;
use crate::utils::logging::LoggingHelper;
use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Failure message for a sign-in that overlaps another one
pub const ATTEMPT_IN_PROGRESS: &str = "A sign-in attempt is already in progress";

// =============================================================================
// Suspension points
// =============================================================================

/// Why a step did not produce a value
enum Interrupt {
    Cancelled(Cancelled),
    Failed(AuthError),
}

impl From<AuthError> for Interrupt {
    fn from(err: AuthError) -> Self {
        Interrupt::Failed(err)
    }
}

/// Run one collaborator call as a cancellable suspension point
///
/// Both a fired token and a collaborator-reported cancellation become
/// [`Interrupt::Cancelled`].
async fn suspend<T, F>(
    cancel: &CancellationToken,
    step: &'static str,
    operation: F,
) -> Result<T, Interrupt>
where
    F: Future<Output = Result<T, AuthError>>,
{
    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AuthError::Cancelled(format!("{step} aborted by caller"))),
        outcome = operation => outcome,
    };

    match outcome {
        Ok(value) => Ok(value),
        Err(AuthError::Cancelled(reason)) => {
            debug!("{step}: {reason}");
            LoggingHelper::log_cancelled(step);
            Err(Interrupt::Cancelled(Cancelled { step }))
        }
        Err(err) => Err(Interrupt::Failed(err)),
    }
}

/// Settles the session state when an attempt ends without succeeding,
/// including when its future is dropped mid-step
struct SettleOnDrop<'a> {
    manager: &'a SessionManager,
    armed: bool,
}

impl<'a> SettleOnDrop<'a> {
    fn arm(manager: &'a SessionManager) -> Self {
        Self {
            manager,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.manager.settle_state();
        }
    }
}

// =============================================================================
// Session Manager Structure
// =============================================================================

pub struct SessionManager {
    identity: Arc<dyn IdentityProviderClient>,
    backend: Arc<dyn AuthBackend>,
    request: BeginSignInRequest,
    flight: FlightControl,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Create a manager over injected collaborators
    ///
    /// The initial state reflects whatever session the backend already holds.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProviderClient>,
        backend: Arc<dyn AuthBackend>,
        request: BeginSignInRequest,
    ) -> Self {
        let initial = match backend.current_principal() {
            Some(principal) => SessionState::SignedIn {
                user_id: principal.uid,
            },
            None => SessionState::SignedOut,
        };
        let (state, _) = watch::channel(initial);

        Self {
            identity,
            backend,
            request,
            flight: FlightControl::default(),
            state,
        }
    }

    /// Wire the Google identity client and the Firebase backend from settings
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no client id is configured
    pub fn from_settings(settings: &SignInSettings) -> Result<Self, AuthError> {
        let request = BeginSignInRequest::from_settings(&settings.provider)?;
        let store = Arc::new(SessionStore::new());
        let identity = Arc::new(GoogleIdentityClient::from_settings(settings));
        let backend = Arc::new(FirebaseAuthBackend::from_settings(settings, store));

        LoggingHelper::log_client_configured(
            identity.provider_id(),
            &request.id_token_options.server_client_id,
            request.auto_select_enabled,
        );
        LoggingHelper::log_backend_configured(
            &settings.backend.name,
            settings.backend.get_api_key().is_some(),
        );

        Ok(Self::new(identity, backend, request))
    }

    #[must_use]
    pub fn request(&self) -> &BeginSignInRequest {
        &self.request
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Observe state transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Whether a begin/complete operation is running right now
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        debug!(
            "Session state {} -> {}",
            previous.label(),
            self.state.borrow().label()
        );
    }

    /// Return to whatever the backend says after an attempt ends without success
    fn settle_state(&self) {
        let next = match self.backend.current_principal() {
            Some(principal) => SessionState::SignedIn {
                user_id: principal.uid,
            },
            None => SessionState::SignedOut,
        };
        self.set_state(next);
    }

    fn attempt_label(&self) -> String {
        match &*self.state.borrow() {
            SessionState::Authenticating { attempt_id, .. } => attempt_id.to_string(),
            _ => "unsolicited".to_string(),
        }
    }
}

// =============================================================================
// Sign-in handshake
// =============================================================================

impl SessionManager {
    /// Ask the identity provider for a sign-in intent to display
    ///
    /// Returns `Ok(None)` when the provider could not start a flow or another
    /// attempt is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the operation was cancelled
    pub async fn begin_sign_in(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<SignInIntent>, Cancelled> {
        let Some(_flight) = self.flight.try_acquire() else {
            LoggingHelper::log_attempt_rejected("begin_sign_in");
            return Ok(None);
        };

        match suspend(cancel, "begin_sign_in", self.identity.begin_sign_in(&self.request)).await {
            Ok(intent) => {
                self.set_state(SessionState::authenticating());
                Ok(Some(intent))
            }
            Err(Interrupt::Failed(err)) => {
                LoggingHelper::log_begin_sign_in_failed(&err);
                Ok(None)
            }
            Err(Interrupt::Cancelled(cancelled)) => Err(cancelled),
        }
    }

    /// Exchange the picker payload for a signed-in user
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the operation was cancelled at any of its
    /// suspension points; all other failures are a failed [`SignInResult`]
    pub async fn complete_sign_in(
        &self,
        payload: &SignInPayload,
        cancel: &CancellationToken,
    ) -> Result<SignInResult, Cancelled> {
        let Some(_flight) = self.flight.try_acquire() else {
            LoggingHelper::log_attempt_rejected("complete_sign_in");
            return Ok(SignInResult::failure(ATTEMPT_IN_PROGRESS));
        };
        let settle = SettleOnDrop::arm(self);
        let attempt = self.attempt_label();

        match self.exchange(payload, cancel).await {
            Ok(user) => {
                LoggingHelper::log_sign_in_completed(&user.user_id, &attempt);
                settle.disarm();
                self.set_state(SessionState::SignedIn {
                    user_id: user.user_id.clone(),
                });
                Ok(SignInResult::Success(user))
            }
            Err(Interrupt::Failed(err)) => {
                LoggingHelper::log_sign_in_failed(&err, &attempt);
                Ok(SignInResult::failure(err.message()))
            }
            Err(Interrupt::Cancelled(cancelled)) => Err(cancelled),
        }
    }

    /// The strictly ordered steps of `complete_sign_in`
    async fn exchange(
        &self,
        payload: &SignInPayload,
        cancel: &CancellationToken,
    ) -> Result<UserData, Interrupt> {
        let credential = suspend(
            cancel,
            "credential_from_result",
            self.identity.credential_from_result(payload),
        )
        .await?;

        let id_token = credential.id_token.ok_or_else(|| {
            AuthError::Provider("Provider credential carries no ID token".to_string())
        })?;
        let federated = FederatedCredential::new(self.identity.provider_id(), id_token);

        let principal = suspend(
            cancel,
            "exchange_credential",
            self.backend.exchange_credential(&federated),
        )
        .await?;

        let token = suspend(
            cancel,
            "get_token",
            self.backend.get_token(&principal, true),
        )
        .await?;

        Ok(UserData::from_principal(&principal, TokenHandle::ready(token)))
    }
}

// =============================================================================
// Session queries and sign-out
// =============================================================================

impl SessionManager {
    /// Read the ambient session without waiting on the network
    ///
    /// The returned token starts empty. One background refresh resolves it;
    /// if that refresh fails, or no Tokio runtime is running, it never
    /// resolves and the session stays signed in.
    #[must_use]
    pub fn get_signed_in_user(&self) -> Option<UserData> {
        let principal = self.backend.current_principal()?;
        let (token, resolver) = TokenHandle::pending();
        let user = UserData::from_principal(&principal, token);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let backend = Arc::clone(&self.backend);
                runtime.spawn(async move {
                    match backend.get_token(&principal, true).await {
                        Ok(token) => resolver.resolve(token),
                        Err(err) => LoggingHelper::log_token_refresh_failed(&principal.uid, &err),
                    }
                });
            }
            Err(_) => warn!(
                "No async runtime available, token for {} stays pending",
                principal.uid
            ),
        }

        Some(user)
    }

    /// Forget the provider account, then clear the backend session
    ///
    /// The backend step runs even when the provider step failed. Each step's
    /// outcome is reported separately.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if either step was cancelled
    pub async fn sign_out(&self, cancel: &CancellationToken) -> Result<SignOutReport, Cancelled> {
        let provider = match suspend(cancel, "provider_sign_out", self.identity.sign_out()).await {
            Ok(()) => Ok(()),
            Err(Interrupt::Failed(err)) => Err(SignOutError::Provider(err.message().to_string())),
            Err(Interrupt::Cancelled(cancelled)) => {
                self.settle_state();
                return Err(cancelled);
            }
        };

        let backend = match suspend(cancel, "backend_sign_out", self.backend.sign_out()).await {
            Ok(()) => Ok(()),
            Err(Interrupt::Failed(err)) => Err(SignOutError::Backend(err.message().to_string())),
            Err(Interrupt::Cancelled(cancelled)) => {
                self.settle_state();
                return Err(cancelled);
            }
        };

        self.settle_state();
        Ok(SignOutReport { provider, backend })
    }

    /// Sign out for the UI: failures are logged, never returned
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if sign-out was cancelled
    pub async fn sign_out_best_effort(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let report = self.sign_out(cancel).await?;
        LoggingHelper::log_sign_out_report(&report);
        Ok(())
    }
}
