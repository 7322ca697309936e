// OAuth redirect target: finishes the sign-in started by `oauth_sign_in`
use crate::models::SignInPayload;
use crate::session::{SessionManager, SignInViewState};
use actix_web::{web, HttpRequest, HttpResponse, Result};
use log::debug;
use tokio_util::sync::CancellationToken;

use super::types::ErrorResponse;

/// Complete the sign-in with the raw redirect query
///
/// Responds with the view state the UI renders: `200` on success, `401`
/// when the attempt failed.
///
/// # Errors
/// Never fails; failures are part of the view state
pub async fn oauth_callback(
    req: HttpRequest,
    session_manager: web::Data<SessionManager>,
    shutdown: web::Data<CancellationToken>,
) -> Result<HttpResponse> {
    let payload = SignInPayload::new(req.query_string());
    debug!("OAuth callback received: {payload:?}");

    let mut view = SignInViewState::default();
    view.on_begin();

    let cancel = shutdown.child_token();
    match session_manager.complete_sign_in(&payload, &cancel).await {
        Ok(result) => {
            view.on_result(&result);
            if view.is_successful() {
                Ok(HttpResponse::Ok().json(view))
            } else {
                Ok(HttpResponse::Unauthorized().json(view))
            }
        }
        Err(cancelled) => Ok(ErrorResponse::cancelled(&cancelled)),
    }
}
