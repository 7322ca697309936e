// Userinfo handler for the ambient session
use crate::session::SessionManager;
use actix_web::{web, HttpResponse, Result};
use log::debug;

use super::types::{ErrorResponse, UserInfoResponse};

/// Return the signed-in user without waiting for a fresh token
///
/// # Errors
/// Never fails; a signed-out session is `401`
pub async fn oauth_userinfo(session_manager: web::Data<SessionManager>) -> Result<HttpResponse> {
    session_manager.get_signed_in_user().map_or_else(
        || {
            debug!("Userinfo endpoint: nobody is signed in");
            Ok(ErrorResponse::unauthorized())
        },
        |user| Ok(HttpResponse::Ok().json(UserInfoResponse::from(&user))),
    )
}
