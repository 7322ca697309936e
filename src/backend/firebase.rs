//! Firebase Authentication over its REST API
//!
//! `accounts:signInWithIdp` exchanges the Google ID token for a Firebase
//! user and session; the Secure Token `token` endpoint refreshes the
//! session token with the refresh token kept in the [`SessionStore`].

use crate::backend::{ActiveSession, AuthBackend, SessionStore};
use crate::models::auth::AuthError;
use crate::models::{FederatedCredential, Principal};
use crate::settings::{BackendSettings, SignInSettings};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Token lifetime assumed when the backend omits `expiresIn`
const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpResponse {
    local_id: String,
    display_name: Option<String>,
    photo_url: Option<String>,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct FirebaseAuthBackend {
    settings: BackendSettings,
    store: Arc<SessionStore>,
    http_client: reqwest::Client,
    refresh_skew: Duration,
}

impl FirebaseAuthBackend {
    #[must_use]
    pub fn new(
        settings: BackendSettings,
        store: Arc<SessionStore>,
        refresh_skew_seconds: u64,
    ) -> Self {
        let skew = i64::try_from(refresh_skew_seconds)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS)
            .min(DEFAULT_TOKEN_LIFETIME_SECONDS);
        Self {
            settings,
            store,
            http_client: reqwest::Client::new(),
            refresh_skew: Duration::seconds(skew),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &SignInSettings, store: Arc<SessionStore>) -> Self {
        Self::new(
            settings.backend.clone(),
            store,
            settings.session.token_refresh_skew_seconds,
        )
    }

    fn api_key(&self) -> Result<String, AuthError> {
        self.settings.get_api_key().ok_or_else(|| {
            AuthError::Configuration(format!(
                "API key not configured for backend {}",
                self.settings.name
            ))
        })
    }

    async fn sign_in_with_idp(
        &self,
        credential: &FederatedCredential,
    ) -> Result<SignInWithIdpResponse, AuthError> {
        let api_key = self.api_key()?;
        let url = format!("{}/accounts:signInWithIdp", self.settings.identity_toolkit_url);

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", api_key.as_str())])
            .json(&sign_in_request_body(credential, &self.settings.request_uri))
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        read_json(response).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshTokenResponse, AuthError> {
        let api_key = self.api_key()?;
        let url = format!("{}/token", self.settings.secure_token_url);

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        read_json(response).await
    }
}

/// JSON body for `accounts:signInWithIdp`
#[must_use]
pub fn sign_in_request_body(
    credential: &FederatedCredential,
    request_uri: &str,
) -> serde_json::Value {
    let post_body = format!(
        "id_token={}&providerId={}",
        urlencoding::encode(&credential.id_token),
        urlencoding::encode(&credential.provider_id)
    );
    json!({
        "postBody": post_body,
        "requestUri": request_uri,
        "returnIdpCredential": true,
        "returnSecureToken": true,
    })
}

/// Absolute expiry from the backend's `expiresIn` seconds string
#[must_use]
pub fn expiry_from(expires_in: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let seconds = expires_in
        .and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|seconds| *seconds > 0)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS)
        .min(DEFAULT_TOKEN_LIFETIME_SECONDS * 24);
    now + Duration::seconds(seconds)
}

/// The backend's error message, or the raw body when it is not an error envelope
#[must_use]
pub fn backend_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map_or_else(|_| body.trim().to_string(), |envelope| envelope.error.message)
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AuthError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::Backend(e.to_string()))?;

    if !status.is_success() {
        debug!("Auth backend answered {status}");
        return Err(AuthError::Backend(backend_error_message(&body)));
    }

    serde_json::from_str(&body)
        .map_err(|e| AuthError::Backend(format!("Invalid auth backend response: {e}")))
}

#[async_trait]
impl AuthBackend for FirebaseAuthBackend {
    async fn exchange_credential(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Principal, AuthError> {
        let response = self.sign_in_with_idp(credential).await?;

        let principal = Principal {
            uid: response.local_id,
            display_name: response.display_name,
            photo_url: response.photo_url,
        };
        let expires_at = expiry_from(response.expires_in.as_deref(), Utc::now());

        self.store.establish(ActiveSession {
            principal: principal.clone(),
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_at,
        });
        info!("Backend session established for user {}", principal.uid);

        Ok(principal)
    }

    fn current_principal(&self) -> Option<Principal> {
        self.store.principal()
    }

    async fn get_token(
        &self,
        principal: &Principal,
        force_refresh: bool,
    ) -> Result<String, AuthError> {
        let session = self
            .store
            .current()
            .filter(|session| session.principal.uid == principal.uid)
            .ok_or_else(|| {
                AuthError::Backend(format!("User {} is no longer signed in", principal.uid))
            })?;

        if !force_refresh && !session.expires_within(self.refresh_skew, Utc::now()) {
            return Ok(session.id_token);
        }

        let refresh_token = session
            .refresh_token
            .ok_or_else(|| AuthError::Backend("Session has no refresh token".to_string()))?;

        let refreshed = self.refresh(&refresh_token).await?;
        let expires_at = expiry_from(refreshed.expires_in.as_deref(), Utc::now());

        if !self.store.update_tokens(
            &principal.uid,
            refreshed.id_token.clone(),
            refreshed.refresh_token,
            expires_at,
        ) {
            return Err(AuthError::Backend(format!(
                "User {} signed out during token refresh",
                principal.uid
            )));
        }
        debug!("Refreshed session token for user {}", principal.uid);

        Ok(refreshed.id_token)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.store.clear() {
            info!("Backend session cleared");
        }
        Ok(())
    }
}
