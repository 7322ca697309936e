//! Shared testing utilities
//!
//! ## Organization
//!
//! - [`fixtures`] - Pre-built test data (principals, credentials, settings)
//! - [`mock`] - Scripted identity provider and auth backend collaborators
//!
//! ## Usage
//!
//! ```rust,ignore
//! use smoking_auth::testing::{fixtures::TestFixtures, mock::{MockAuthBackend, MockIdentityProvider}};
//! use std::sync::Arc;
//!
//! let identity = Arc::new(MockIdentityProvider::new());
//! let backend = Arc::new(MockAuthBackend::new());
//! let manager = TestFixtures::session_manager(identity, backend);
//! assert!(manager.get_signed_in_user().is_none());
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::{MockAuthBackend, MockBehavior, MockIdentityProvider};

/// Common test constants
pub mod constants {
    /// Default test user id assigned by the backend
    pub const TEST_UID: &str = "firebase-uid-123";

    /// Default test account id (the Google account e-mail)
    pub const TEST_EMAIL: &str = "test@example.com";

    /// Default test display name
    pub const TEST_USER_NAME: &str = "Test User";

    /// Default test profile picture
    pub const TEST_PHOTO_URL: &str = "https://example.com/photo.png";

    /// Default provider ID token
    pub const TEST_ID_TOKEN: &str = "header.eyJzdWIiOiIxMjMifQ.signature";

    /// Default test OAuth client id
    pub const TEST_CLIENT_ID: &str = "test-client.apps.googleusercontent.com";

    /// Default backend provider id for Google
    pub const TEST_PROVIDER_ID: &str = "google.com";
}
