//! Auth backend
//!
//! The auth backend exchanges a provider credential for a principal, owns
//! the ambient session and issues refreshable session tokens.

pub mod firebase;
pub mod store;

pub use firebase::FirebaseAuthBackend;
pub use store::{ActiveSession, SessionStore};

use crate::models::auth::AuthError;
use crate::models::{FederatedCredential, Principal};
use async_trait::async_trait;

/// Auth backend collaborator of the session manager
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange a provider credential and establish the ambient session
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the credential or the call fails
    async fn exchange_credential(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Principal, AuthError>;

    /// The currently signed-in principal; never blocks on the network
    fn current_principal(&self) -> Option<Principal>;

    /// Session token for `principal`, refreshed when forced or near expiry
    ///
    /// # Errors
    ///
    /// Returns an error if `principal` is no longer signed in or the
    /// refresh fails
    async fn get_token(&self, principal: &Principal, force_refresh: bool)
        -> Result<String, AuthError>;

    /// Clear the ambient session
    ///
    /// # Errors
    ///
    /// Returns an error if the session could not be cleared
    async fn sign_out(&self) -> Result<(), AuthError>;
}
