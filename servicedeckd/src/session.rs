use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use axum::http::{header, HeaderMap, HeaderValue};
use rand::RngCore;
use shared::protocol::SESSION_COOKIE;
use shared::types::UserInfo;

/// The authenticated party behind a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub is_admin: bool,
}

impl Principal {
    pub fn admin(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_admin: true,
        }
    }
}

impl From<Principal> for UserInfo {
    fn from(p: Principal) -> Self {
        UserInfo {
            username: p.username,
            is_admin: p.is_admin,
        }
    }
}

/// Issue, check, and revoke opaque session tokens.
pub trait SessionStore: Send + Sync {
    fn create(&self, principal: Principal) -> String;

    /// Returns the principal for a live token, extending its expiry.
    fn validate(&self, token: &str) -> Option<Principal>;

    fn destroy(&self, token: &str);
}

struct SessionEntry {
    principal: Principal,
    expires_at: Instant,
}

/// Process-local sessions with a sliding TTL
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionEntry>> {
        // A panic while holding the lock leaves the map itself intact
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, principal: Principal) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let now = Instant::now();
        let mut sessions = self.lock();
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.insert(
            token.clone(),
            SessionEntry {
                principal,
                expires_at: now + self.ttl,
            },
        );

        token
    }

    fn validate(&self, token: &str) -> Option<Principal> {
        let now = Instant::now();
        let mut sessions = self.lock();

        let entry = sessions.get_mut(token)?;
        if entry.expires_at <= now {
            sessions.remove(token);
            return None;
        }

        entry.expires_at = now + self.ttl;
        Some(entry.principal.clone())
    }

    fn destroy(&self, token: &str) {
        self.lock().remove(token);
    }
}

/// Attributes for the session cookie
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub max_age: Duration,
    pub secure: bool,
}

impl CookieSettings {
    pub fn issue(&self, token: &str) -> HeaderValue {
        self.build(token, self.max_age.as_secs())
    }

    pub fn clear(&self) -> HeaderValue {
        self.build("", 0)
    }

    fn build(&self, value: &str, max_age: u64) -> HeaderValue {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        // Tokens are hex and the attributes are ASCII
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

/// Pull the session token out of the request's `Cookie` headers.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
