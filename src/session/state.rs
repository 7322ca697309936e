//! Conceptual session state and the in-flight guard

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Session-level state of the sign-in flow
///
/// `SignedOut → Authenticating` when a sign-in intent is issued,
/// `Authenticating → SignedIn` on a successful exchange, back to the
/// backend-derived state on failure or cancellation, and `SignedIn →
/// SignedOut` on sign-out. A failed token refresh leaves `SignedIn` as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    Authenticating {
        attempt_id: Uuid,
        started_at: DateTime<Utc>,
    },
    SignedIn {
        user_id: String,
    },
}

impl SessionState {
    #[must_use]
    pub fn authenticating() -> Self {
        SessionState::Authenticating {
            attempt_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionState::SignedIn { .. })
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::SignedOut => "signed_out",
            SessionState::Authenticating { .. } => "authenticating",
            SessionState::SignedIn { .. } => "signed_in",
        }
    }
}

/// Admits one sign-in operation at a time
#[derive(Debug, Default)]
pub struct FlightControl {
    busy: AtomicBool,
}

/// Held for the duration of an admitted operation; dropping it (also when
/// the operation's future is dropped) admits the next one
#[derive(Debug)]
pub struct FlightGuard<'a> {
    busy: &'a AtomicBool,
}

impl FlightControl {
    #[must_use]
    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { busy: &self.busy })
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
