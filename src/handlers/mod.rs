// HTTP request handlers for the loopback sign-in host
pub mod auth;
pub mod callback;
pub mod types;
pub mod userinfo;


use crate::models::HealthResponse;
use actix_web::{web, HttpResponse, Result};

// Re-export the main handler functions
pub use auth::{oauth_sign_in, oauth_sign_out};
pub use callback::oauth_callback;
pub use userinfo::oauth_userinfo;

/// Health check handler
///
/// # Errors
/// This function currently never returns an error
pub async fn health() -> Result<HttpResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        message: "Smoking sign-in host is running".to_string(),
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Register every route; shared by the binary and the handler tests
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.route("/ping", web::get().to(health))
        .route("/auth/oauth2/sign_in", web::get().to(oauth_sign_in))
        .route("/auth/oauth2/callback", web::get().to(oauth_callback))
        .route("/auth/oauth2/userinfo", web::get().to(oauth_userinfo))
        .service(
            web::resource("/auth/oauth2/sign_out")
                .route(web::get().to(oauth_sign_out))
                .route(web::post().to(oauth_sign_out)),
        );
}
