// Sign-in and sign-out handlers
use crate::session::SessionManager;
use crate::utils::logging::LoggingHelper;
use actix_web::{web, HttpResponse, Result};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use super::types::{ErrorResponse, SignOutResponse};

/// Start a sign-in and send the browser to the account picker
///
/// # Errors
/// Never fails; an unavailable picker is reported as `503`
pub async fn oauth_sign_in(
    session_manager: web::Data<SessionManager>,
    shutdown: web::Data<CancellationToken>,
) -> Result<HttpResponse> {
    let cancel = shutdown.child_token();

    match session_manager.begin_sign_in(&cancel).await {
        Ok(Some(intent)) => {
            info!("Redirecting to account picker (state length {})", intent.state.len());
            Ok(HttpResponse::Found()
                .append_header(("Location", intent.url))
                .finish())
        }
        Ok(None) => {
            warn!("No sign-in intent available");
            Ok(HttpResponse::ServiceUnavailable().json(ErrorResponse::new(
                "sign_in_unavailable",
                "The identity provider could not start a sign-in",
            )))
        }
        Err(cancelled) => Ok(ErrorResponse::cancelled(&cancelled)),
    }
}

/// Sign out from the identity provider and the auth backend
///
/// # Errors
/// Never fails; failed steps are listed in the response body
pub async fn oauth_sign_out(
    session_manager: web::Data<SessionManager>,
    shutdown: web::Data<CancellationToken>,
) -> Result<HttpResponse> {
    let cancel = shutdown.child_token();

    match session_manager.sign_out(&cancel).await {
        Ok(report) => {
            LoggingHelper::log_sign_out_report(&report);
            Ok(HttpResponse::Ok().json(SignOutResponse::from(&report)))
        }
        Err(cancelled) => Ok(ErrorResponse::cancelled(&cancelled)),
    }
}
