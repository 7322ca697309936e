#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the smoking-auth application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use backend::{AuthBackend, FirebaseAuthBackend, SessionStore};
pub use handlers::{health, oauth_callback, oauth_sign_in, oauth_sign_out, oauth_userinfo};
pub use identity::{BeginSignInRequest, GoogleIdentityClient, IdentityProviderClient};
pub use models::auth::{AuthError, Cancelled, SignOutReport};
pub use models::{SignInResult, UserData};
pub use session::SessionManager;
pub use settings::SignInSettings;
