//! State the UI renders for the sign-in screen

use crate::models::SignInResult;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignInViewState {
    #[default]
    Idle,
    Loading,
    Success {
        user_id: String,
        username: Option<String>,
    },
    Error {
        message: String,
    },
}

impl SignInViewState {
    #[must_use]
    pub fn from_result(result: &SignInResult) -> Self {
        match result {
            SignInResult::Success(user) => SignInViewState::Success {
                user_id: user.user_id.clone(),
                username: user.username.clone(),
            },
            SignInResult::Failure { error_message } => SignInViewState::Error {
                message: error_message.clone(),
            },
        }
    }

    pub fn on_begin(&mut self) {
        *self = SignInViewState::Loading;
    }

    pub fn on_result(&mut self, result: &SignInResult) {
        *self = Self::from_result(result);
    }

    /// A cancelled attempt leaves nothing to show
    pub fn on_cancelled(&mut self) {
        self.reset();
    }

    pub fn reset(&mut self) {
        *self = SignInViewState::Idle;
    }

    #[must_use]
    pub fn is_successful(&self) -> bool {
        matches!(self, SignInViewState::Success { .. })
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            SignInViewState::Error { message } => Some(message),
            _ => None,
        }
    }
}
