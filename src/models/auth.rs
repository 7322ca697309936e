//! Authentication error taxonomy
//!
//! Collaborators report failures as [`AuthError`]. The session manager
//! normalizes everything except cancellation into result values, so
//! [`Cancelled`] is the only fault that ever reaches the UI layer.

use std::fmt;

/// Errors reported by the identity provider and auth backend collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The in-flight operation was aborted by the user or the system
    Cancelled(String),
    /// The identity provider could not start a flow or yield a credential
    Provider(String),
    /// The auth backend rejected the credential or the call failed
    Backend(String),
    /// Missing or invalid client configuration
    Configuration(String),
}

impl AuthError {
    /// The underlying message without the category prefix
    ///
    /// This is the text surfaced to the UI in a failed `SignInResult`.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            AuthError::Cancelled(msg)
            | AuthError::Provider(msg)
            | AuthError::Backend(msg)
            | AuthError::Configuration(msg) => msg,
        }
    }

    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AuthError::Cancelled(_))
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Cancelled(msg) => write!(f, "Operation cancelled: {msg}"),
            AuthError::Provider(msg) => write!(f, "Identity provider error: {msg}"),
            AuthError::Backend(msg) => write!(f, "Auth backend error: {msg}"),
            AuthError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Cancellation of a session manager operation
///
/// Returned as the `Err` side of every manager operation. Callers must let
/// it unwind their task rather than render it as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancelled {
    /// The suspension point at which the cancellation was observed
    pub step: &'static str,
}

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sign-in operation cancelled during {}", self.step)
    }
}

impl std::error::Error for Cancelled {}

/// Failure of one of the two sign-out steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutError {
    /// The identity provider could not forget the remembered account
    Provider(String),
    /// The auth backend could not clear the ambient session
    Backend(String),
}

impl fmt::Display for SignOutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignOutError::Provider(msg) => write!(f, "Provider sign-out failed: {msg}"),
            SignOutError::Backend(msg) => write!(f, "Backend sign-out failed: {msg}"),
        }
    }
}

impl std::error::Error for SignOutError {}

/// Outcome of both sign-out steps, each observed independently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutReport {
    pub provider: Result<(), SignOutError>,
    pub backend: Result<(), SignOutError>,
}

impl SignOutReport {
    /// Both steps succeeded
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.provider.is_ok() && self.backend.is_ok()
    }

    /// Failures of either step, provider first
    #[must_use]
    pub fn failures(&self) -> Vec<&SignOutError> {
        [&self.provider, &self.backend]
            .into_iter()
            .filter_map(|step| step.as_ref().err())
            .collect()
    }
}
