//! Sign-in request options passed to the identity provider

use crate::models::auth::AuthError;
use crate::settings::ProviderSettings;

/// Options for requesting an ID-token credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdTokenRequestOptions {
    pub supported: bool,
    pub filter_by_authorized_accounts: bool,
    /// Registered client id the ID token is issued for
    pub server_client_id: String,
}

impl GoogleIdTokenRequestOptions {
    #[must_use]
    pub fn builder() -> GoogleIdTokenRequestOptionsBuilder {
        GoogleIdTokenRequestOptionsBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct GoogleIdTokenRequestOptionsBuilder {
    supported: bool,
    filter_by_authorized_accounts: bool,
    server_client_id: Option<String>,
}

impl GoogleIdTokenRequestOptionsBuilder {
    #[must_use]
    pub fn supported(mut self, supported: bool) -> Self {
        self.supported = supported;
        self
    }

    #[must_use]
    pub fn filter_by_authorized_accounts(mut self, filter: bool) -> Self {
        self.filter_by_authorized_accounts = filter;
        self
    }

    #[must_use]
    pub fn server_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.server_client_id = Some(client_id.into());
        self
    }

    /// # Errors
    ///
    /// Returns a configuration error if ID tokens are requested without a
    /// server client id
    pub fn build(self) -> Result<GoogleIdTokenRequestOptions, AuthError> {
        let server_client_id = match self.server_client_id {
            Some(id) if !id.trim().is_empty() => id,
            _ if self.supported => {
                return Err(AuthError::Configuration(
                    "ID token requests need a server client id".to_string(),
                ))
            }
            _ => String::new(),
        };

        Ok(GoogleIdTokenRequestOptions {
            supported: self.supported,
            filter_by_authorized_accounts: self.filter_by_authorized_accounts,
            server_client_id,
        })
    }
}

/// Request handed to [`super::IdentityProviderClient::begin_sign_in`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginSignInRequest {
    pub id_token_options: GoogleIdTokenRequestOptions,
    pub auto_select_enabled: bool,
}

impl BeginSignInRequest {
    #[must_use]
    pub fn builder(id_token_options: GoogleIdTokenRequestOptions) -> BeginSignInRequestBuilder {
        BeginSignInRequestBuilder {
            id_token_options,
            auto_select_enabled: false,
        }
    }

    /// The app's standard request: ID token, any account, auto-select on
    ///
    /// Filtering and auto-select follow the provider settings, which
    /// default to filter off and auto-select on.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no client id is configured
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, AuthError> {
        let client_id = settings.get_client_id().ok_or_else(|| {
            AuthError::Configuration(format!(
                "Client ID not configured for provider {}",
                settings.name
            ))
        })?;

        let options = GoogleIdTokenRequestOptions::builder()
            .supported(true)
            .filter_by_authorized_accounts(settings.filter_by_authorized_accounts)
            .server_client_id(client_id)
            .build()?;

        Ok(Self::builder(options)
            .auto_select_enabled(settings.auto_select)
            .build())
    }
}

#[derive(Debug)]
pub struct BeginSignInRequestBuilder {
    id_token_options: GoogleIdTokenRequestOptions,
    auto_select_enabled: bool,
}

impl BeginSignInRequestBuilder {
    #[must_use]
    pub fn auto_select_enabled(mut self, enabled: bool) -> Self {
        self.auto_select_enabled = enabled;
        self
    }

    #[must_use]
    pub fn build(self) -> BeginSignInRequest {
        BeginSignInRequest {
            id_token_options: self.id_token_options,
            auto_select_enabled: self.auto_select_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_SERVER_CLIENT_ID;

    #[test]
    fn test_default_request_offers_any_account() {
        let mut settings = ProviderSettings::default();
        settings.client_id_env = None;

        let request = BeginSignInRequest::from_settings(&settings).unwrap();
        assert!(request.id_token_options.supported);
        assert!(!request.id_token_options.filter_by_authorized_accounts);
        assert!(request.auto_select_enabled);
        assert_eq!(
            request.id_token_options.server_client_id,
            DEFAULT_SERVER_CLIENT_ID
        );
    }

    #[test]
    fn test_missing_client_id_is_configuration_error() {
        let settings = ProviderSettings {
            client_id: None,
            client_id_env: None,
            ..ProviderSettings::default()
        };

        let err = BeginSignInRequest::from_settings(&settings).unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn test_builder_requires_client_id_for_id_tokens() {
        assert!(GoogleIdTokenRequestOptions::builder()
            .supported(true)
            .server_client_id("  ")
            .build()
            .is_err());

        let unsupported = GoogleIdTokenRequestOptions::builder().build().unwrap();
        assert!(!unsupported.supported);
        assert!(unsupported.server_client_id.is_empty());
    }
}
