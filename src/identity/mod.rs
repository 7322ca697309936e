//! Identity provider client
//!
//! The identity provider runs the account-selection flow and issues the
//! provider credential (an ID token) that the auth backend later accepts.

pub mod google;
pub mod request;

pub use google::GoogleIdentityClient;
pub use request::{BeginSignInRequest, GoogleIdTokenRequestOptions};

use crate::models::auth::AuthError;
use crate::models::{ProviderCredential, SignInIntent, SignInPayload};
use async_trait::async_trait;

/// Identity provider collaborator of the session manager
#[async_trait]
pub trait IdentityProviderClient: Send + Sync {
    /// Begin an interactive sign-in flow
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot start a flow. Implementations
    /// report user or system aborts as [`AuthError::Cancelled`].
    async fn begin_sign_in(&self, request: &BeginSignInRequest) -> Result<SignInIntent, AuthError>;

    /// Turn the picker's payload into a provider credential
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed, was dismissed, or the
    /// provider refuses to issue a credential
    async fn credential_from_result(
        &self,
        payload: &SignInPayload,
    ) -> Result<ProviderCredential, AuthError>;

    /// Forget the remembered account
    ///
    /// # Errors
    ///
    /// Returns an error if the provider could not forget the account
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Identifier the auth backend uses for this provider, e.g. `google.com`
    fn provider_id(&self) -> &str;
}
