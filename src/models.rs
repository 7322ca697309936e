use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::watch;

pub mod auth;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Authenticated user record held by the auth backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Credential yielded by the identity provider for the selected account
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredential {
    /// Account identifier (usually the e-mail address)
    pub id: String,
    pub display_name: Option<String>,
    pub profile_picture_uri: Option<String>,
    pub id_token: Option<String>,
}

impl fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("profile_picture_uri", &self.profile_picture_uri)
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Provider ID token wrapped for the backend exchange
#[derive(Clone, PartialEq, Eq)]
pub struct FederatedCredential {
    /// Backend provider identifier, e.g. `google.com`
    pub provider_id: String,
    pub id_token: String,
}

impl FederatedCredential {
    #[must_use]
    pub fn new(provider_id: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            id_token: id_token.into(),
        }
    }
}

impl fmt::Debug for FederatedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedCredential")
            .field("provider_id", &self.provider_id)
            .field("id_token_len", &self.id_token.len())
            .finish()
    }
}

/// Opaque descriptor the UI layer uses to show the account picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignInIntent {
    pub url: String,
    pub state: String,
}

/// Opaque payload produced by the account picker for a [`SignInIntent`]
#[derive(Clone, PartialEq, Eq)]
pub struct SignInPayload(String);

impl SignInPayload {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build a payload from the full redirect URL the picker landed on
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed
    pub fn from_redirect_url(redirect: &str) -> Result<Self, url::ParseError> {
        let url = url::Url::parse(redirect)?;
        Ok(Self(url.query().unwrap_or_default().to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decoded key/value pairs of the payload; later keys win
    #[must_use]
    pub fn params(&self) -> HashMap<String, String> {
        url::form_urlencoded::parse(self.0.as_bytes())
            .into_owned()
            .collect()
    }
}

impl fmt::Debug for SignInPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignInPayload({} bytes)", self.0.len())
    }
}

/// Session token that may still be on its way
///
/// Resolves at most once. Readers never observe a partially written value:
/// they see either the empty placeholder or the final token.
#[derive(Clone)]
pub struct TokenHandle {
    rx: watch::Receiver<Option<String>>,
}

/// Write side of a pending [`TokenHandle`]
pub struct TokenResolver {
    tx: watch::Sender<Option<String>>,
}

impl TokenHandle {
    /// A handle whose token is already known
    #[must_use]
    pub fn ready(token: impl Into<String>) -> Self {
        let (_tx, rx) = watch::channel(Some(token.into()));
        Self { rx }
    }

    /// A handle whose token arrives later through the returned resolver
    #[must_use]
    pub fn pending() -> (Self, TokenResolver) {
        let (tx, rx) = watch::channel(None);
        (Self { rx }, TokenResolver { tx })
    }

    /// The token if resolved, otherwise the empty placeholder
    #[must_use]
    pub fn current(&self) -> String {
        self.rx.borrow().clone().unwrap_or_default()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait for the token
    ///
    /// Returns `None` if the resolver was dropped without a token, which
    /// happens when the refresh failed.
    pub async fn resolved(&self) -> Option<String> {
        let mut rx = self.rx.clone();
        let value = rx.wait_for(Option::is_some).await.ok()?;
        (*value).clone()
    }
}

impl fmt::Debug for TokenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl TokenResolver {
    /// Publish the token; consuming the resolver makes this a one-shot update
    pub fn resolve(self, token: String) {
        self.tx.send_replace(Some(token));
    }
}

/// Identity record handed to the UI layer
#[derive(Debug, Clone)]
pub struct UserData {
    pub user_id: String,
    pub username: Option<String>,
    pub profile_picture_url: Option<String>,
    pub token: TokenHandle,
}

impl UserData {
    #[must_use]
    pub fn from_principal(principal: &Principal, token: TokenHandle) -> Self {
        Self {
            user_id: principal.uid.clone(),
            username: principal.display_name.clone(),
            profile_picture_url: principal.photo_url.clone(),
            token,
        }
    }
}

/// Outcome of a sign-in exchange
///
/// Exactly one of [`SignInResult::data`] and [`SignInResult::error_message`]
/// is present.
#[derive(Debug, Clone)]
pub enum SignInResult {
    Success(UserData),
    Failure { error_message: String },
}

impl SignInResult {
    #[must_use]
    pub fn failure(error_message: impl Into<String>) -> Self {
        SignInResult::Failure {
            error_message: error_message.into(),
        }
    }

    #[must_use]
    pub fn data(&self) -> Option<&UserData> {
        match self {
            SignInResult::Success(user) => Some(user),
            SignInResult::Failure { .. } => None,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            SignInResult::Success(_) => None,
            SignInResult::Failure { error_message } => Some(error_message),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, SignInResult::Success(_))
    }

    #[must_use]
    pub fn into_data(self) -> Option<UserData> {
        match self {
            SignInResult::Success(user) => Some(user),
            SignInResult::Failure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal {
            uid: "u1".to_string(),
            display_name: Some("Ann".to_string()),
            photo_url: None,
        }
    }

    #[test]
    fn test_sign_in_result_is_exclusive() {
        let success = SignInResult::Success(UserData::from_principal(
            &principal(),
            TokenHandle::ready("t"),
        ));
        assert!(success.data().is_some());
        assert!(success.error_message().is_none());

        let failure = SignInResult::failure("boom");
        assert!(failure.data().is_none());
        assert_eq!(failure.error_message(), Some("boom"));
    }

    #[test]
    fn test_user_data_from_principal() {
        let user = UserData::from_principal(&principal(), TokenHandle::ready("abc"));
        assert_eq!(user.user_id, "u1");
        assert_eq!(user.username.as_deref(), Some("Ann"));
        assert!(user.profile_picture_url.is_none());
        assert_eq!(user.token.current(), "abc");
    }

    #[tokio::test]
    async fn test_pending_token_resolves_once() {
        let (handle, resolver) = TokenHandle::pending();
        assert!(!handle.is_ready());
        assert_eq!(handle.current(), "");

        resolver.resolve("fresh".to_string());
        assert!(handle.is_ready());
        assert_eq!(handle.resolved().await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_dropped_resolver_yields_none() {
        let (handle, resolver) = TokenHandle::pending();
        drop(resolver);
        assert_eq!(handle.resolved().await, None);
        assert_eq!(handle.current(), "");
    }

    #[test]
    fn test_payload_from_redirect_url() {
        let payload = SignInPayload::from_redirect_url(
            "http://127.0.0.1:8085/auth/oauth2/callback?code=abc%2F1&state=xyz",
        )
        .unwrap();
        let params = payload.params();
        assert_eq!(params.get("code").map(String::as_str), Some("abc/1"));
        assert_eq!(params.get("state").map(String::as_str), Some("xyz"));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credential = FederatedCredential::new("google.com", "secret.id.token");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("secret"));
        assert!(format!("{:?}", SignInPayload::new("code=secret")).contains("11 bytes"));
    }
}
