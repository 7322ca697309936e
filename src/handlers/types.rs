// Response bodies shared by the sign-in handlers
use crate::models::auth::{Cancelled, SignOutReport};
use crate::models::UserData;
use actix_web::HttpResponse;
use serde::Serialize;

/// Signed-in user as exposed over HTTP; the token value never leaves the process
#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub user_id: String,
    pub username: Option<String>,
    pub profile_picture_url: Option<String>,
    pub token_ready: bool,
}

impl From<&UserData> for UserInfoResponse {
    fn from(user: &UserData) -> Self {
        Self {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            profile_picture_url: user.profile_picture_url.clone(),
            token_ready: user.token.is_ready(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub signed_out: bool,
    pub provider_error: Option<String>,
    pub backend_error: Option<String>,
}

impl From<&SignOutReport> for SignOutResponse {
    fn from(report: &SignOutReport) -> Self {
        Self {
            signed_out: report.is_complete(),
            provider_error: report.provider.as_ref().err().map(ToString::to_string),
            backend_error: report.backend.as_ref().err().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_description: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(error: &str, description: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            error_description: description.into(),
        }
    }

    #[must_use]
    pub fn unauthorized() -> HttpResponse {
        HttpResponse::Unauthorized().json(Self::new(
            "unauthorized",
            "Authentication is required to access this resource",
        ))
    }

    /// The request was abandoned, usually because the server is shutting down
    #[must_use]
    pub fn cancelled(cancelled: &Cancelled) -> HttpResponse {
        HttpResponse::ServiceUnavailable().json(Self::new("cancelled", cancelled.to_string()))
    }
}
