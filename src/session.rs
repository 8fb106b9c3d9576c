//! Authenticated user sessions.
//!
//! A [`Session`] is identified by an unguessable key that travels in the
//! `session_key` cookie. The [`SessionManager`] keeps at most one live
//! session per user, hands out a fresh key on every authenticated request
//! and drops expired sessions lazily, at most once per [`PRUNE_INTERVAL`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use tokio::time::Instant;

use crate::cookie::{Cookie, SameSite};

/// Name of the cookie that carries the session key.
pub const SESSION_COOKIE: &str = "session_key";

/// Minimum time between two sweeps for expired sessions.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(5 * 60);

const KEY_BYTES: usize = 64;

// ── Session ───────────────────────────────────────────────────────────────────

/// A logged-in user's session.
#[derive(Clone, Debug)]
pub struct Session {
    key: String,
    user_id: String,
    lifetime: Duration,
    valid_until: Instant,
    privileges: HashMap<String, bool>,
}

impl Session {
    fn new(user_id: String, lifetime: Duration, privileges: HashMap<String, bool>) -> Self {
        Self {
            key: generate_key(),
            user_id,
            lifetime,
            valid_until: Instant::now() + lifetime,
            privileges,
        }
    }

    pub fn key(&self) -> &str { &self.key }
    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn valid_until(&self) -> Instant { self.valid_until }
    pub fn privileges(&self) -> &HashMap<String, bool> { &self.privileges }

    /// `false` once `valid_until` has been reached.
    pub fn is_valid(&self) -> bool {
        Instant::now() < self.valid_until
    }

    /// A privilege only counts while the session is valid.
    pub fn has_privilege(&self, name: &str) -> bool {
        self.is_valid() && self.privileges.get(name).copied().unwrap_or(false)
    }

    fn renew(&mut self) {
        self.key = generate_key();
        self.valid_until = Instant::now() + self.lifetime;
    }
}

/// 64 bytes from the OS RNG, base64 encoded.
fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

// ── SessionManager ────────────────────────────────────────────────────────────

struct Sessions {
    by_key: HashMap<String, Session>,
    /// user id → key of that user's session in `by_key`.
    by_user: HashMap<String, String>,
    last_prune: Instant,
}

impl Sessions {
    fn prune(&mut self) {
        let now = Instant::now();
        if now < self.last_prune + PRUNE_INTERVAL {
            return;
        }
        self.by_key.retain(|_, session| session.is_valid());
        let by_key = &self.by_key;
        self.by_user.retain(|_, key| by_key.contains_key(key));
        self.last_prune = now;
    }

    fn remove(&mut self, key: &str) -> Option<Session> {
        let session = self.by_key.remove(key)?;
        if self.by_user.get(&session.user_id).is_some_and(|k| k == key) {
            self.by_user.remove(&session.user_id);
        }
        Some(session)
    }
}

/// Tracks the sessions of authenticated users.
///
/// Thread-safe: handlers create and end sessions while the accept loop
/// looks them up and renews them.
pub struct SessionManager {
    lifetime: Duration,
    sessions: Mutex<Sessions>,
}

impl SessionManager {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            sessions: Mutex::new(Sessions {
                by_key: HashMap::new(),
                by_user: HashMap::new(),
                last_prune: Instant::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Creates a session for `user`, replacing any session the user had.
    pub fn new_session(&self, user: &str) -> Session {
        self.new_session_with_privileges(user, HashMap::new())
    }

    pub fn new_session_with_privileges(&self, user: &str, privileges: HashMap<String, bool>) -> Session {
        let mut sessions = self.lock();
        if let Some(old_key) = sessions.by_user.remove(user) {
            sessions.by_key.remove(&old_key);
        }

        let session = Session::new(user.to_owned(), self.lifetime, privileges);
        sessions.by_user.insert(user.to_owned(), session.key.clone());
        sessions.by_key.insert(session.key.clone(), session.clone());
        session
    }

    /// The session for `key`, if it exists and has not expired.
    pub fn session(&self, key: &str) -> Option<Session> {
        let mut sessions = self.lock();
        sessions.prune();
        sessions.by_key.get(key).filter(|s| s.is_valid()).cloned()
    }

    pub fn valid_session(&self, key: &str) -> bool {
        self.session(key).is_some()
    }

    /// Gives `session` a new key and a new expiry. The old key stops
    /// working. Returns `None` if the session has ended or expired.
    pub fn renew(&self, session: &Session) -> Option<Session> {
        let mut sessions = self.lock();
        let mut renewed = sessions.remove(&session.key).filter(Session::is_valid)?;
        renewed.renew();
        sessions.by_user.insert(renewed.user_id.clone(), renewed.key.clone());
        sessions.by_key.insert(renewed.key.clone(), renewed.clone());
        Some(renewed)
    }

    /// Ends the session for `key` (logout).
    pub fn end_session(&self, key: &str) -> Option<Session> {
        self.lock().remove(key)
    }

    /// Number of stored sessions, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `session_key` cookie that hands `session` to the client.
    pub fn session_cookie(&self, session: &Session) -> Cookie {
        let mut cookie = Cookie::with_checked_name(SESSION_COOKIE.to_owned(), session.key.clone());
        cookie.set_path("/");
        // Max-age must be positive; sub-second lifetimes round up.
        let _ = cookie.set_max_age(self.lifetime.as_secs().max(1));
        cookie.set_same_site(SameSite::Strict);
        cookie.set_http_only(true);
        cookie
    }
}

impl Default for SessionManager {
    /// Sessions live for 24 hours.
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60 * 24))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[test]
    fn keys_are_long_and_unique() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a, b);
        assert_eq!(STANDARD.decode(&a).unwrap().len(), KEY_BYTES);
    }

    #[test]
    fn one_session_per_user() {
        let manager = SessionManager::default();
        let first = manager.new_session("alice");
        let second = manager.new_session("alice");

        assert_ne!(first.key(), second.key());
        assert!(manager.session(first.key()).is_none());
        assert_eq!(manager.session(second.key()).unwrap().user_id(), "alice");
        assert_eq!(manager.len(), 1);

        manager.new_session("bob");
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn renew_replaces_the_key() {
        let manager = SessionManager::default();
        let session = manager.new_session("alice");
        let renewed = manager.renew(&session).unwrap();

        assert_ne!(session.key(), renewed.key());
        assert!(!manager.valid_session(session.key()));
        assert!(manager.valid_session(renewed.key()));
        assert!(renewed.valid_until() >= session.valid_until());

        // The stale copy can no longer be renewed.
        assert!(manager.renew(&session).is_none());

        // A new login after renewal still evicts the renewed session.
        let again = manager.new_session("alice");
        assert!(!manager.valid_session(renewed.key()));
        assert!(manager.valid_session(again.key()));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn end_session_logs_out() {
        let manager = SessionManager::default();
        let session = manager.new_session("alice");
        assert!(manager.end_session(session.key()).is_some());
        assert!(manager.session(session.key()).is_none());
        assert!(manager.is_empty());
        assert!(manager.end_session(session.key()).is_none());
    }

    #[test]
    fn privileges_require_a_valid_session() {
        let manager = SessionManager::default();
        let privileges = HashMap::from([("admin".to_owned(), true), ("audit".to_owned(), false)]);
        let session = manager.new_session_with_privileges("root", privileges);
        assert!(session.has_privilege("admin"));
        assert!(!session.has_privilege("audit"));
        assert!(!session.has_privilege("unknown"));
    }

    #[test]
    fn session_cookie_carries_the_key() {
        let manager = SessionManager::new(Duration::from_secs(600));
        let session = manager.new_session("alice");
        let cookie = manager.session_cookie(&session);

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), session.key());
        assert_eq!(cookie.max_age(), Some(600));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert!(cookie.http_only());
        assert_eq!(cookie.path(), Some("/"));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_sessions_are_hidden_then_pruned() {
        let manager = SessionManager::new(Duration::from_secs(60));
        let session = manager.new_session("alice");

        advance(Duration::from_secs(61)).await;
        assert!(!session.is_valid());
        assert!(manager.session(session.key()).is_none());
        // Expired but not yet swept: the prune interval has not elapsed.
        assert_eq!(manager.len(), 1);
        assert!(manager.renew(&session).is_none());
        assert_eq!(manager.len(), 0, "renew of an expired session drops it");

        let other = manager.new_session("bob");
        advance(Duration::from_secs(61)).await;
        assert!(manager.session(other.key()).is_none());
        assert_eq!(manager.len(), 1);

        advance(PRUNE_INTERVAL).await;
        assert!(manager.session("no such key").is_none());
        assert_eq!(manager.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn prune_runs_at_most_once_per_interval() {
        let manager = SessionManager::new(Duration::from_secs(10));
        advance(PRUNE_INTERVAL).await;

        // First lookup after the interval sweeps (nothing to sweep yet).
        let session = manager.new_session("alice");
        assert!(manager.session(session.key()).is_some());

        advance(Duration::from_secs(11)).await;
        assert!(manager.session(session.key()).is_none());
        assert_eq!(manager.len(), 1);

        advance(PRUNE_INTERVAL).await;
        manager.session(session.key());
        assert_eq!(manager.len(), 0);
    }
}
