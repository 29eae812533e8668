//! TTL-bounded login sessions.

use crate::credentials::hex;
use crate::error::SchedulerError;
use dashmap::DashMap;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use tracing::debug;

/// Map key for a login. Stores a digest of the bearer token, never the token.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn from_token(token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        let result = hasher.finalize();
        Self(hex::encode(&result[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", &self.0[..8.min(self.0.len())])
    }
}

#[derive(Clone)]
struct SessionEntry {
    email: String,
    created_at: Instant,
}

/// Thread-safe map of live sessions to user emails.
pub struct SessionStore {
    entries: DashMap<SessionKey, SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Starts a session for `email` and returns the bearer token.
    /// Expired logins are swept first.
    pub fn login(&self, email: &str) -> String {
        self.cleanup_expired();
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = hex::encode(&raw);
        let key = SessionKey::from_token(&token);
        debug!("Started {} for {}", key, email);
        self.entries.insert(
            key,
            SessionEntry {
                email: email.to_string(),
                created_at: Instant::now(),
            },
        );
        token
    }

    /// Returns the email behind a token if the session is still live.
    pub fn resolve(&self, token: &str) -> Result<String, SchedulerError> {
        let key = SessionKey::from_token(token);
        let email = self.entries.get(&key).and_then(|entry| {
            if entry.created_at.elapsed() < self.ttl {
                Some(entry.email.clone())
            } else {
                None
            }
        });
        match email {
            Some(email) => Ok(email),
            None => {
                self.entries.remove(&key);
                Err(SchedulerError::Unauthenticated)
            }
        }
    }

    pub fn logout(&self, token: &str) {
        self.entries.remove(&SessionKey::from_token(token));
    }

    /// Drops every session of a user, e.g. after the account is deleted.
    pub fn logout_user(&self, email: &str) {
        self.entries.retain(|_, entry| entry.email != email);
    }

    pub fn cleanup_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.created_at.elapsed() < ttl);
    }

    pub fn stats(&self) -> SessionStats {
        let mut total = 0;
        let mut expired = 0;

        for entry in self.entries.iter() {
            total += 1;
            if entry.created_at.elapsed() >= self.ttl {
                expired += 1;
            }
        }

        SessionStats {
            total_sessions: total,
            expired_sessions: expired,
            active_sessions: total - expired,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionStats {
    pub total_sessions: usize,
    pub expired_sessions: usize,
    pub active_sessions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_hashing() {
        let key1 = SessionKey::from_token("token123");
        let key2 = SessionKey::from_token("token123");
        let key3 = SessionKey::from_token("token456");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
        assert_eq!(key1.to_string().len(), "session#".len() + 8);
    }

    #[test]
    fn test_login_resolve_logout() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.login("john@uwm.edu");
        assert_eq!(store.resolve(&token).unwrap(), "john@uwm.edu");

        store.logout(&token);
        assert_eq!(store.resolve(&token), Err(SchedulerError::Unauthenticated));
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let store = SessionStore::new(Duration::ZERO);
        let token = store.login("john@uwm.edu");
        assert_eq!(store.stats().expired_sessions, 1);
        assert_eq!(store.resolve(&token), Err(SchedulerError::Unauthenticated));
        assert_eq!(store.stats().total_sessions, 0);
    }

    #[test]
    fn test_login_sweeps_expired_sessions() {
        let store = SessionStore::new(Duration::ZERO);
        store.login("john@uwm.edu");
        store.login("paul@uwm.edu");
        store.login("ringo@uwm.edu");
        // only the newest login survives the sweep
        assert_eq!(store.stats().total_sessions, 1);
    }

    #[test]
    fn test_logout_user_drops_all_sessions() {
        let store = SessionStore::new(Duration::from_secs(60));
        let a = store.login("john@uwm.edu");
        let b = store.login("john@uwm.edu");
        let c = store.login("paul@uwm.edu");
        store.logout_user("john@uwm.edu");
        assert!(store.resolve(&a).is_err());
        assert!(store.resolve(&b).is_err());
        assert!(store.resolve(&c).is_ok());
    }
}
