// Centralized logging for the sign-in flow; tokens are never logged, only their presence
use log::{debug, info, warn};

use crate::models::auth::{AuthError, SignOutReport};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log the configured collaborators at startup
    pub fn log_client_configured(provider_id: &str, client_id: &str, auto_select: bool) {
        info!(
            "✅ Identity provider {provider_id} configured (client {client_id}, auto-select: {auto_select})"
        );
    }

    pub fn log_backend_configured(backend: &str, api_key_present: bool) {
        if api_key_present {
            info!("✅ Auth backend {backend} configured");
        } else {
            warn!("❌ Auth backend {backend} has no API key - credential exchange will fail");
        }
    }

    /// Log the authorization URL parameters (never the PKCE verifier)
    pub fn log_sign_in_url_built(provider: &str, scopes: &str, prompt: Option<&str>) {
        info!("🔍 Built {provider} sign-in URL with scopes: {scopes} and prompt: {prompt:?}");
    }

    pub fn log_begin_sign_in_failed(err: &AuthError) {
        warn!("Begin sign-in failed, no intent available: {err}");
    }

    pub fn log_token_exchange_start(provider: &str) {
        info!("🔄 Exchanging authorization code for tokens with {provider}");
    }

    pub fn log_token_response_raw(provider: &str, response_len: usize) {
        debug!("Raw {provider} token response received ({response_len} bytes)");
    }

    /// Log token exchange summary
    pub fn log_token_exchange_summary(
        provider: &str,
        access_token: Option<&String>,
        id_token: Option<&String>,
        scope: Option<&String>,
    ) {
        info!(
            "🔍 Token exchange summary for {}: access_token={}, id_token={}, scope={:?}",
            provider,
            access_token.map_or("missing", |_| "present"),
            id_token.map_or("missing", |_| "present"),
            scope,
        );
    }

    pub fn log_sign_in_completed(user_id: &str, attempt: &str) {
        info!("Sign-in attempt {attempt} completed for user {user_id}");
    }

    pub fn log_sign_in_failed(err: &AuthError, attempt: &str) {
        warn!("Sign-in attempt {attempt} failed: {err}");
    }

    pub fn log_attempt_rejected(operation: &str) {
        warn!("Rejected {operation}: another sign-in attempt is in flight");
    }

    pub fn log_cancelled(step: &str) {
        info!("⏹️  Sign-in operation cancelled during {step}");
    }

    pub fn log_token_refresh_failed(user_id: &str, err: &AuthError) {
        warn!("Token refresh for {user_id} failed, session stays signed in with a stale token: {err}");
    }

    /// Log each failed sign-out step; sign-out is best effort
    pub fn log_sign_out_report(report: &SignOutReport) {
        if report.is_complete() {
            info!("Signed out from provider and backend");
            return;
        }
        for failure in report.failures() {
            warn!("{failure}");
        }
    }
}
