//! Google identity provider over OAuth 2.0 authorization code + PKCE
//!
//! The intent descriptor is the authorization URL; the picker payload is the
//! query string Google redirects back with. Pending flows live in memory
//! only and expire after the configured TTL.

use crate::identity::{BeginSignInRequest, IdentityProviderClient};
use crate::models::auth::AuthError;
use crate::models::{ProviderCredential, SignInIntent, SignInPayload};
use crate::settings::{ProviderSettings, SignInSettings};
use crate::utils::crypto::{generate_csrf_token, generate_nonce, IdTokenClaims, PkcePair};
use crate::utils::logging::LoggingHelper;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

const MAX_FLOW_TTL_SECONDS: i64 = 86_400;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    id_token: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// State kept between `begin_sign_in` and `credential_from_result`
struct PendingFlow {
    nonce: String,
    pkce_verifier: String,
    client_id: String,
    created_at: DateTime<Utc>,
}

/// Account the provider remembers after a successful sign-in
struct RememberedAccount {
    account_id: String,
    access_token: Option<String>,
}

pub struct GoogleIdentityClient {
    settings: ProviderSettings,
    http_client: reqwest::Client,
    flow_ttl: Duration,
    pending: Mutex<HashMap<String, PendingFlow>>,
    remembered: Mutex<Option<RememberedAccount>>,
}

impl GoogleIdentityClient {
    #[must_use]
    pub fn new(settings: ProviderSettings, flow_ttl_seconds: u64) -> Self {
        let ttl_seconds = i64::try_from(flow_ttl_seconds)
            .unwrap_or(MAX_FLOW_TTL_SECONDS)
            .min(MAX_FLOW_TTL_SECONDS);
        Self {
            settings,
            http_client: reqwest::Client::new(),
            flow_ttl: Duration::seconds(ttl_seconds),
            pending: Mutex::new(HashMap::new()),
            remembered: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &SignInSettings) -> Self {
        Self::new(settings.provider.clone(), settings.session.flow_ttl_seconds)
    }

    /// Account id of the remembered account, if any
    #[must_use]
    pub fn remembered_account(&self) -> Option<String> {
        self.remembered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|account| account.account_id.clone())
    }

    /// Number of flows waiting for a picker result
    #[must_use]
    pub fn pending_flows(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn is_expired(&self, flow: &PendingFlow, now: DateTime<Utc>) -> bool {
        now - flow.created_at >= self.flow_ttl
    }

    fn prune_expired_flows(&self) {
        let now = Utc::now();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let before = pending.len();
        pending.retain(|_, flow| !self.is_expired(flow, now));
        if pending.len() != before {
            debug!("Pruned {} expired sign-in flows", before - pending.len());
        }
    }

    fn build_authorization_url(
        &self,
        request: &BeginSignInRequest,
        state: &str,
        nonce: &str,
        code_challenge: &str,
    ) -> Result<String, AuthError> {
        let scopes = self.settings.scopes.join(" ");
        let mut url = url::Url::parse(&self.settings.authorization_endpoint).map_err(|e| {
            AuthError::Configuration(format!("Invalid authorization endpoint: {e}"))
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", &request.id_token_options.server_client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes)
            .append_pair("state", state)
            .append_pair("nonce", nonce)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");

        let prompt = (!request.auto_select_enabled).then_some("select_account");
        if let Some(prompt) = prompt {
            url.query_pairs_mut().append_pair("prompt", prompt);
        }

        if request.id_token_options.filter_by_authorized_accounts {
            if let Some(account) = self.remembered_account() {
                url.query_pairs_mut().append_pair("login_hint", &account);
            }
        }

        LoggingHelper::log_sign_in_url_built(&self.settings.name, &scopes, prompt);
        Ok(url.to_string())
    }

    /// Take the pending flow for `state`; each state is usable once
    fn take_pending_flow(&self, state: &str) -> Result<PendingFlow, AuthError> {
        let flow = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(state)
            .ok_or_else(|| {
                AuthError::Provider("Unknown or already used sign-in state".to_string())
            })?;

        if self.is_expired(&flow, Utc::now()) {
            return Err(AuthError::Provider("Sign-in flow expired".to_string()));
        }
        Ok(flow)
    }

    async fn exchange_code(
        &self,
        code: &str,
        flow: &PendingFlow,
    ) -> Result<TokenResponse, AuthError> {
        let client_secret = self.settings.get_client_secret();
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", self.settings.redirect_uri.as_str());
        params.insert("client_id", flow.client_id.as_str());
        params.insert("code_verifier", flow.pkce_verifier.as_str());
        if let Some(secret) = client_secret.as_deref() {
            params.insert("client_secret", secret);
        }

        LoggingHelper::log_token_exchange_start(&self.settings.name);
        let response = self
            .http_client
            .post(&self.settings.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("Failed to exchange code for token: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| AuthError::Provider(format!("Failed to read token response: {e}")))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TokenErrorResponse>(&response_text).map_or_else(
                |_| response_text.clone(),
                |err| match err.error_description {
                    Some(description) => format!("{}: {description}", err.error),
                    None => err.error,
                },
            );
            return Err(AuthError::Provider(format!(
                "Token exchange failed with status {status}: {reason}"
            )));
        }

        LoggingHelper::log_token_response_raw(&self.settings.name, response_text.len());
        let token_response: TokenResponse = serde_json::from_str(&response_text)
            .map_err(|e| AuthError::Provider(format!("Failed to parse token response: {e}")))?;

        LoggingHelper::log_token_exchange_summary(
            &self.settings.name,
            token_response.access_token.as_ref(),
            token_response.id_token.as_ref(),
            token_response.scope.as_ref(),
        );
        Ok(token_response)
    }

    async fn revoke(&self, endpoint: &str, token: &str) -> Result<(), AuthError> {
        let response = self
            .http_client
            .post(endpoint)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("Failed to revoke token: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AuthError::Provider(format!(
                "Token revocation failed with status {}",
                response.status()
            )))
        }
    }
}

/// Reject redirects that carry an OAuth error instead of a code
fn check_redirect_error(params: &HashMap<String, String>) -> Result<(), AuthError> {
    let Some(error) = params.get("error") else {
        return Ok(());
    };
    let message = match (error.as_str(), params.get("error_description")) {
        ("access_denied", _) => "Sign-in was dismissed before an account was chosen".to_string(),
        (error, Some(description)) => format!("Sign-in failed: {error}: {description}"),
        (error, None) => format!("Sign-in failed: {error}"),
    };
    Err(AuthError::Provider(message))
}

/// Bind the ID token to its flow and refuse one that has already expired
fn check_id_token_claims(
    claims: &IdTokenClaims,
    expected_nonce: &str,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    if claims.nonce.as_deref() != Some(expected_nonce) {
        return Err(AuthError::Provider("ID token nonce mismatch".to_string()));
    }
    if claims.exp.is_some_and(|exp| exp <= now.timestamp()) {
        return Err(AuthError::Provider("ID token has expired".to_string()));
    }
    Ok(())
}

#[async_trait]
impl IdentityProviderClient for GoogleIdentityClient {
    async fn begin_sign_in(&self, request: &BeginSignInRequest) -> Result<SignInIntent, AuthError> {
        if !request.id_token_options.supported {
            return Err(AuthError::Configuration(
                "Sign-in request does not ask for an ID token".to_string(),
            ));
        }
        self.prune_expired_flows();

        let state = generate_csrf_token();
        let nonce = generate_nonce(16);
        let pkce = PkcePair::generate();
        let url = self.build_authorization_url(request, &state, &nonce, &pkce.challenge)?;

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                state.clone(),
                PendingFlow {
                    nonce,
                    pkce_verifier: pkce.verifier,
                    client_id: request.id_token_options.server_client_id.clone(),
                    created_at: Utc::now(),
                },
            );

        Ok(SignInIntent { url, state })
    }

    async fn credential_from_result(
        &self,
        payload: &SignInPayload,
    ) -> Result<ProviderCredential, AuthError> {
        let params = payload.params();
        // A redirect error still consumes the flow it answers
        let flow = params.get("state").map(|state| self.take_pending_flow(state));
        check_redirect_error(&params)?;

        let flow = flow
            .ok_or_else(|| AuthError::Provider("Sign-in result is missing state".to_string()))??;
        let code = params.get("code").ok_or_else(|| {
            AuthError::Provider("Sign-in result is missing the authorization code".to_string())
        })?;

        let tokens = self.exchange_code(code, &flow).await?;

        let Some(id_token) = tokens.id_token else {
            return Ok(ProviderCredential {
                id: String::new(),
                display_name: None,
                profile_picture_uri: None,
                id_token: None,
            });
        };

        let claims = IdTokenClaims::from_id_token(&id_token).map_err(AuthError::Provider)?;
        check_id_token_claims(&claims, &flow.nonce, Utc::now())?;

        let account_id = claims.email.clone().unwrap_or_else(|| claims.sub.clone());
        *self.remembered.lock().unwrap_or_else(PoisonError::into_inner) = Some(RememberedAccount {
            account_id: account_id.clone(),
            access_token: tokens.access_token,
        });

        Ok(ProviderCredential {
            id: account_id,
            display_name: claims.name,
            profile_picture_uri: claims.picture,
            id_token: Some(id_token),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let remembered = self
            .remembered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(account) = remembered else {
            debug!("No remembered account to forget");
            return Ok(());
        };
        debug!("Forgot remembered account {}", account.account_id);

        match (&self.settings.revocation_endpoint, account.access_token) {
            (Some(endpoint), Some(access_token)) => self.revoke(endpoint, &access_token).await,
            _ => Ok(()),
        }
    }

    fn provider_id(&self) -> &str {
        &self.settings.provider_id
    }
}
