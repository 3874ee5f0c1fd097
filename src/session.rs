//! Session-cookie store backing the auth boundary.
//!
//! Login exchanges a client identity token for a server-side session with a
//! fixed 5-day expiry; logout removes it. The batch and normalization logic
//! never sees session data; the store only answers "is this session
//! allowed to call the scan endpoints".

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Cookie name carrying the session ID.
pub const SESSION_COOKIE: &str = "session";

/// Session lifetime: 5 days.
pub const SESSION_TTL_SECS: u64 = 5 * 24 * 60 * 60;

/// Clock source, injectable so tests can expire sessions deterministically.
pub type Clock = fn() -> u64;

fn system_clock() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// In-memory session store. Expired entries are evicted lazily on lookup.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, u64>>>,
    clock: Clock,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_clock(system_clock)
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Create a session, returning its ID.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let expires_at = (self.clock)() + SESSION_TTL_SECS;
        self.inner.write().unwrap().insert(id.clone(), expires_at);
        id
    }

    /// True when the session exists and has not expired. Expired entries
    /// are removed on the way out.
    pub fn is_valid(&self, id: &str) -> bool {
        let now = (self.clock)();
        {
            let sessions = self.inner.read().unwrap();
            match sessions.get(id) {
                Some(expires_at) if *expires_at > now => return true,
                None => return false,
                Some(_) => {}
            }
        }
        self.inner.write().unwrap().remove(id);
        false
    }

    /// Remove a session. Returns true if it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.inner.write().unwrap().remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock() -> u64 {
        1_000_000
    }

    #[test]
    fn test_create_and_validate() {
        let store = SessionStore::with_clock(fixed_clock);
        let id = store.create();
        assert!(store.is_valid(&id));
        assert!(!store.is_valid("nope"));
    }

    #[test]
    fn test_remove() {
        let store = SessionStore::with_clock(fixed_clock);
        let id = store.create();
        assert!(store.remove(&id));
        assert!(!store.is_valid(&id));
        assert!(!store.remove(&id));
    }

    #[test]
    fn test_expired_session_evicted() {
        let store = SessionStore::with_clock(fixed_clock);
        // Entry that expired one second before "now".
        store
            .inner
            .write()
            .unwrap()
            .insert("old".to_string(), fixed_clock() - 1);
        assert!(!store.is_valid("old"));
        assert!(!store.inner.read().unwrap().contains_key("old"));
    }
}
