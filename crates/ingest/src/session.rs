//! Pseudonymous session identity: a long-lived id generated once per client
//! context and persisted in durable storage until cleared externally.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;

/// Storage key the session id lives under.
const SESSION_KEY: &str = "shoppulse_session_id";

/// Client-durable key/value storage for the session id. Implementations
/// wrap whatever the client context persists across restarts.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: &str);
}

/// In-memory session storage for tests and embedded deployments.
#[derive(Default)]
pub struct MemorySessionStorage {
    entries: DashMap<String, String>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn put(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

/// Hands out the stable session id for a client context, creating it lazily
/// on first use. Always returns a non-empty string.
#[derive(Clone)]
pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Return the persisted session id, generating and storing a fresh one
    /// if none exists yet.
    pub fn get_or_create(&self) -> String {
        if let Some(existing) = self.storage.get(SESSION_KEY) {
            if !existing.is_empty() {
                return existing;
            }
        }
        let id = generate_session_id();
        self.storage.put(SESSION_KEY, &id);
        id
    }
}

/// Timestamp plus random suffix: practically unique, not cryptographic.
fn generate_session_id() -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("sess-{}-{:08x}", Utc::now().timestamp_millis(), suffix)
}
