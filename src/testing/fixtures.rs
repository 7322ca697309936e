//! Test fixtures providing pre-built test objects

use crate::backend::{ActiveSession, AuthBackend};
use crate::identity::{BeginSignInRequest, GoogleIdTokenRequestOptions, IdentityProviderClient};
use crate::models::{Principal, ProviderCredential, SignInPayload};
use crate::session::SessionManager;
use crate::settings::SignInSettings;
use chrono::{Duration, Utc};
use std::sync::Arc;

use super::constants::{
    TEST_CLIENT_ID, TEST_EMAIL, TEST_ID_TOKEN, TEST_PHOTO_URL, TEST_UID, TEST_USER_NAME,
};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    #[must_use]
    pub fn principal() -> Principal {
        Principal {
            uid: TEST_UID.to_string(),
            display_name: Some(TEST_USER_NAME.to_string()),
            photo_url: Some(TEST_PHOTO_URL.to_string()),
        }
    }

    /// A Google credential carrying an ID token
    #[must_use]
    pub fn provider_credential() -> ProviderCredential {
        ProviderCredential {
            id: TEST_EMAIL.to_string(),
            display_name: Some(TEST_USER_NAME.to_string()),
            profile_picture_uri: Some(TEST_PHOTO_URL.to_string()),
            id_token: Some(TEST_ID_TOKEN.to_string()),
        }
    }

    /// A credential for an account that yielded no ID token
    #[must_use]
    pub fn credential_without_token() -> ProviderCredential {
        ProviderCredential {
            id_token: None,
            ..Self::provider_credential()
        }
    }

    #[must_use]
    pub fn active_session() -> ActiveSession {
        ActiveSession {
            principal: Self::principal(),
            id_token: "stored-token".to_string(),
            refresh_token: Some("stored-refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    /// Picker payload as Google would redirect it back
    #[must_use]
    pub fn payload() -> SignInPayload {
        SignInPayload::new("state=state-1&code=4%2F0AX4XfWh&scope=openid")
    }

    /// The standard request: ID token, any account, auto-select on
    ///
    /// # Panics
    ///
    /// Panics if the fixed test client id is rejected by the builder.
    #[must_use]
    pub fn request() -> BeginSignInRequest {
        let options = GoogleIdTokenRequestOptions::builder()
            .supported(true)
            .filter_by_authorized_accounts(false)
            .server_client_id(TEST_CLIENT_ID)
            .build()
            .expect("test client id is valid");
        BeginSignInRequest::builder(options)
            .auto_select_enabled(true)
            .build()
    }

    /// Settings pointing at unroutable endpoints with test credentials
    #[must_use]
    pub fn settings() -> SignInSettings {
        let mut settings = SignInSettings::default();
        settings.provider.client_id = Some(TEST_CLIENT_ID.to_string());
        settings.provider.client_secret = Some("test-client-secret".to_string());
        settings.backend.api_key = Some("test-api-key".to_string());
        settings
    }

    #[must_use]
    pub fn session_manager(
        identity: Arc<dyn IdentityProviderClient>,
        backend: Arc<dyn AuthBackend>,
    ) -> SessionManager {
        SessionManager::new(identity, backend, Self::request())
    }
}
