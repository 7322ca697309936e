//! Ambient session slot
//!
//! At most one session is active per store. The store starts empty, is
//! filled by a successful credential exchange and emptied by sign-out.
//! Nothing here touches the disk.

use crate::models::Principal;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Backend session for the currently signed-in principal
#[derive(Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub principal: Principal,
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl ActiveSession {
    /// True when the cached token expires within `skew` of `now`
    #[must_use]
    pub fn expires_within(&self, skew: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at - skew <= now
    }
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("principal", &self.principal)
            .field("id_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    slot: RwLock<Option<ActiveSession>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active session, returning the previous one
    pub fn establish(&self, session: ActiveSession) -> Option<ActiveSession> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(session)
    }

    #[must_use]
    pub fn current(&self) -> Option<ActiveSession> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.principal.clone())
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Store refreshed tokens for `uid`
    ///
    /// Returns `false` without changing anything when `uid` is no longer
    /// the active principal (signed out or replaced meanwhile).
    pub fn update_tokens(
        &self,
        uid: &str,
        id_token: String,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(session) if session.principal.uid == uid => {
                session.id_token = id_token;
                if refresh_token.is_some() {
                    session.refresh_token = refresh_token;
                }
                session.expires_at = expires_at;
                true
            }
            _ => false,
        }
    }

    /// Empty the slot; returns whether a session was active
    pub fn clear(&self) -> bool {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(uid: &str) -> ActiveSession {
        ActiveSession {
            principal: Principal {
                uid: uid.to_string(),
                display_name: None,
                photo_url: None,
            },
            id_token: "token-1".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn test_store_starts_signed_out() {
        let store = SessionStore::new();
        assert!(!store.is_signed_in());
        assert!(store.principal().is_none());
        assert!(!store.clear());
    }

    #[test]
    fn test_single_slot_replacement() {
        let store = SessionStore::new();
        assert!(store.establish(session("u1")).is_none());
        let previous = store.establish(session("u2")).unwrap();

        assert_eq!(previous.principal.uid, "u1");
        assert_eq!(store.principal().unwrap().uid, "u2");
    }

    #[test]
    fn test_update_tokens_only_for_active_principal() {
        let store = SessionStore::new();
        store.establish(session("u1"));
        let expires_at = Utc::now() + Duration::hours(2);

        assert!(!store.update_tokens("u2", "other".to_string(), None, expires_at));
        assert!(store.update_tokens("u1", "token-2".to_string(), None, expires_at));

        let current = store.current().unwrap();
        assert_eq!(current.id_token, "token-2");
        assert_eq!(current.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(current.expires_at, expires_at);
    }

    #[test]
    fn test_clear_signs_out() {
        let store = SessionStore::new();
        store.establish(session("u1"));
        assert!(store.clear());
        assert!(!store.is_signed_in());
        assert!(!store.update_tokens("u1", "late".to_string(), None, Utc::now()));
    }

    #[test]
    fn test_expiry_skew() {
        let now = Utc::now();
        let mut active = session("u1");
        active.expires_at = now + Duration::minutes(4);
        assert!(active.expires_within(Duration::minutes(5), now));
        assert!(!active.expires_within(Duration::minutes(1), now));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", session("u1"));
        assert!(!rendered.contains("token-1"));
        assert!(!rendered.contains("refresh-1"));
    }
}
