//! Session Management Module
//!
//! # Modules
//!
//! - [`manager`] - Orchestrates the federated sign-in handshake and session queries
//! - [`state`] - Session state machine and the in-flight guard
//! - [`view_state`] - Derived state the UI layer renders

pub mod manager;
pub mod state;
pub mod view_state;


pub use manager::{SessionManager, ATTEMPT_IN_PROGRESS};
pub use state::{FlightControl, FlightGuard, SessionState};
pub use view_state::SignInViewState;
