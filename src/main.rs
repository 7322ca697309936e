#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use smoking_auth::{
    handlers::configure_services, session::SessionManager, settings::SignInSettings,
};
use tokio_util::sync::CancellationToken;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = SignInSettings::load().context("Failed to load settings")?;

    let session_manager = SessionManager::from_settings(&settings)
        .context("Failed to configure the sign-in collaborators")?;

    start_server(session_manager, settings).await
}

/// Serve the sign-in flow on the loopback address until shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(
    session_manager: SessionManager,
    settings: SignInSettings,
) -> anyhow::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    let session_manager = web::Data::new(session_manager);
    let shutdown = CancellationToken::new();
    let request_root = web::Data::new(shutdown.clone());

    let outcome = HttpServer::new(move || {
        App::new()
            .app_data(session_manager.clone())
            .app_data(request_root.clone())
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await;

    // Abandon whatever sign-in is still waiting on the network
    shutdown.cancel();
    outcome.context("Server terminated unexpectedly")
}

fn print_startup_info(bind_address: &str, settings: &SignInSettings) {
    println!("Starting Smoking sign-in host on http://{bind_address}");
    println!(
        "Identity provider: {} | Auth backend: {}",
        settings.provider.display_name(),
        settings.backend.name
    );
    println!();
    println!("Sign-in endpoints:");
    println!("  GET  /auth/oauth2/sign_in  - Open the account picker");
    println!("  GET  /auth/oauth2/callback - Complete the sign-in");
    println!("  GET  /auth/oauth2/userinfo - Signed-in user");
    println!("  GET|POST /auth/oauth2/sign_out - Sign out everywhere");
    println!();
    println!("OAuth redirect URI registered with the provider:");
    println!("  {}", settings.provider.redirect_uri);
    println!();
    println!("System endpoints:");
    println!("  GET  /ping            - Health check");
}
