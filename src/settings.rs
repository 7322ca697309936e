use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// OAuth client registered for the Smoking app; used as the ID token audience
pub const DEFAULT_SERVER_CLIENT_ID: &str =
    "745787662781-5jbpej9k9s652v9ak0mba1lp6kgcncq4.apps.googleusercontent.com";

/// Errors raised while loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings file: {0}")]
    Toml(#[from] basic_toml::Error),
    #[error("Failed to initialize logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SignInSettings {
    pub application: ApplicationSettings,
    pub provider: ProviderSettings,
    pub backend: BackendSettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
}

/// Loopback host that receives the provider redirect
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub name: String,
    pub display_name: Option<String>,
    /// Provider identifier understood by the auth backend
    pub provider_id: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub revocation_endpoint: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,

    // Direct values (can be overridden by environment variables)
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    // Environment variable names for overrides
    pub client_id_env: Option<String>,
    pub client_secret_env: Option<String>,

    /// Only offer accounts that previously authorized the app
    pub filter_by_authorized_accounts: bool,
    /// Pick the single matching account without prompting
    pub auto_select: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub name: String,
    pub identity_toolkit_url: String,
    pub secure_token_url: String,
    /// URI reported to the backend as the origin of the IdP response
    pub request_uri: String,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// How long a begun sign-in flow waits for the picker result
    pub flow_ttl_seconds: u64,
    /// Cached session tokens this close to expiry are refreshed
    pub token_refresh_skew_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8085,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: "google".to_string(),
            display_name: Some("Google".to_string()),
            provider_id: "google.com".to_string(),
            authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            revocation_endpoint: Some("https://oauth2.googleapis.com/revoke".to_string()),
            redirect_uri: "http://127.0.0.1:8085/auth/oauth2/callback".to_string(),
            scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
            client_id: Some(DEFAULT_SERVER_CLIENT_ID.to_string()),
            client_secret: None,
            client_id_env: Some("GOOGLE_CLIENT_ID".to_string()),
            client_secret_env: Some("GOOGLE_CLIENT_SECRET".to_string()),
            filter_by_authorized_accounts: false,
            auto_select: true,
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            name: "firebase".to_string(),
            identity_toolkit_url: "https://identitytoolkit.googleapis.com/v1".to_string(),
            secure_token_url: "https://securetoken.googleapis.com/v1".to_string(),
            request_uri: "http://localhost".to_string(),
            api_key: None,
            api_key_env: Some("FIREBASE_API_KEY".to_string()),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            flow_ttl_seconds: 600,
            token_refresh_skew_seconds: 300,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SignInSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - Logger initialization fails
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Self::init_logger(&settings.logging)?;
        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `SMOKING_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    fn load_base_settings() -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_toml_file(default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("SMOKING_SECRETS_DIR") {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_toml_file(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ SMOKING_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_toml_file(path: &Path) -> Result<Self, SettingsError> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_provider_env_overrides(&mut settings.provider);
        Self::apply_session_env_overrides(&mut settings.session);
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            settings.logging.level = log_level;
        }
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
    }

    fn apply_provider_env_overrides(provider_settings: &mut ProviderSettings) {
        if let Ok(redirect_uri) = std::env::var("GOOGLE_REDIRECT_URI") {
            provider_settings.redirect_uri = redirect_uri;
        }
    }

    fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        Self::apply_numeric_env_override(
            "SIGN_IN_FLOW_TTL_SECONDS",
            &mut session_settings.flow_ttl_seconds,
        );
        Self::apply_numeric_env_override(
            "TOKEN_REFRESH_SKEW_SECONDS",
            &mut session_settings.token_refresh_skew_seconds,
        );
    }

    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    fn init_logger(logging: &LoggingSettings) -> Result<(), SettingsError> {
        let env = env_logger::Env::default().default_filter_or(logging.level.as_str());
        env_logger::Builder::from_env(env).try_init()?;
        info!("Logger initialized at level {}", logging.level);
        Ok(())
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = fs::read_to_string(".env") {
            for line in contents.lines() {
                if line.trim_start().starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the loopback server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}

/// Environment variable first, then the direct value
fn env_or_value(env_var: Option<&String>, value: Option<&String>) -> Option<String> {
    if let Some(env_var) = env_var {
        if let Ok(value) = std::env::var(env_var) {
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    value.cloned()
}

impl ProviderSettings {
    /// Get the client ID, checking environment variable first, then falling back to direct value
    #[must_use]
    pub fn get_client_id(&self) -> Option<String> {
        env_or_value(self.client_id_env.as_ref(), self.client_id.as_ref())
    }

    /// Get the client secret, checking environment variable first, then falling back to direct value
    #[must_use]
    pub fn get_client_secret(&self) -> Option<String> {
        env_or_value(self.client_secret_env.as_ref(), self.client_secret.as_ref())
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

impl BackendSettings {
    /// Get the API key, checking environment variable first, then falling back to direct value
    #[must_use]
    pub fn get_api_key(&self) -> Option<String> {
        env_or_value(self.api_key_env.as_ref(), self.api_key.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clean_env_vars() {
        for var in [
            "HOST",
            "PORT",
            "GOOGLE_CLIENT_ID",
            "GOOGLE_CLIENT_SECRET",
            "GOOGLE_REDIRECT_URI",
            "FIREBASE_API_KEY",
            "SIGN_IN_FLOW_TTL_SECONDS",
            "TOKEN_REFRESH_SKEW_SECONDS",
            "SMOKING_SECRETS_DIR",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_sign_in_policy() {
        let settings = SignInSettings::default();
        assert!(!settings.provider.filter_by_authorized_accounts);
        assert!(settings.provider.auto_select);
        assert_eq!(
            settings.provider.client_id.as_deref(),
            Some(DEFAULT_SERVER_CLIENT_ID)
        );
        assert_eq!(settings.provider.provider_id, "google.com");
        assert_eq!(settings.get_bind_address(), "127.0.0.1:8085");
    }

    #[test]
    #[serial]
    fn test_client_id_env_override() {
        clean_env_vars();
        let provider = ProviderSettings::default();
        assert_eq!(
            provider.get_client_id().as_deref(),
            Some(DEFAULT_SERVER_CLIENT_ID)
        );

        std::env::set_var("GOOGLE_CLIENT_ID", "env-client.apps.googleusercontent.com");
        assert_eq!(
            provider.get_client_id().as_deref(),
            Some("env-client.apps.googleusercontent.com")
        );

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_api_key_from_env_only() {
        clean_env_vars();
        let backend = BackendSettings::default();
        assert!(backend.get_api_key().is_none());

        std::env::set_var("FIREBASE_API_KEY", "test-api-key");
        assert_eq!(backend.get_api_key().as_deref(), Some("test-api-key"));

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_numeric_env_overrides() {
        clean_env_vars();
        std::env::set_var("PORT", "9090");
        std::env::set_var("SIGN_IN_FLOW_TTL_SECONDS", "120");
        std::env::set_var("TOKEN_REFRESH_SKEW_SECONDS", "not-a-number");

        let mut settings = SignInSettings::default();
        SignInSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.application.port, 9090);
        assert_eq!(settings.session.flow_ttl_seconds, 120);
        assert_eq!(settings.session.token_refresh_skew_seconds, 300);

        clean_env_vars();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[provider]
client_id = "custom.apps.googleusercontent.com"
auto_select = false

[backend]
api_key = "file-key"
"#
        )
        .unwrap();

        let settings = SignInSettings::from_toml_file(file.path()).unwrap();
        assert_eq!(
            settings.provider.client_id.as_deref(),
            Some("custom.apps.googleusercontent.com")
        );
        assert!(!settings.provider.auto_select);
        assert_eq!(settings.provider.token_endpoint, "https://oauth2.googleapis.com/token");
        assert_eq!(settings.backend.api_key.as_deref(), Some("file-key"));
        assert_eq!(settings.session.flow_ttl_seconds, 600);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provider\nclient_id = ").unwrap();

        let err = SignInSettings::from_toml_file(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Toml(_)));
    }
}
