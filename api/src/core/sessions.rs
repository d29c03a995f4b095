//! Per-session conversation storage with idle expiry and a size cap.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use contextor::ConversationState;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error_handler::{AppError, AppResult};

const MAX_SESSION_ID_LEN: usize = 128;

/// Shared handle to one session's history.
pub type SessionHandle = Arc<Mutex<ConversationState>>;

/// Bounds on how many sessions are kept and for how long.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions untouched for longer than this are dropped by [`SessionRegistry::sweep_idle`].
    pub idle_ttl: Duration,
    /// Creating a session beyond this count evicts the least recently used one.
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(60 * 60),
            max_sessions: 10_000,
        }
    }
}

impl SessionLimits {
    /// `SESSION_IDLE_TTL_SECS` and `MAX_SESSIONS`; unset, zero or unparsable
    /// values keep the defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        let positive = |k: &str| {
            std::env::var(k)
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
        };
        Self {
            idle_ttl: positive("SESSION_IDLE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(d.idle_ttl),
            max_sessions: positive("MAX_SESSIONS")
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(d.max_sessions),
        }
    }
}

struct Entry {
    state: SessionHandle,
    last_used: Instant,
}

/// Session id -> conversation state.
///
/// The map lock is held only for lookups; turns of one session serialize on
/// the session's own mutex while other sessions proceed.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Entry>>,
    limits: SessionLimits,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: SessionLimits) -> Self {
        Self {
            sessions: RwLock::default(),
            limits,
        }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Returns the session, creating it if needed, and marks it as used.
    pub async fn get_or_create(&self, id: &str) -> SessionHandle {
        let now = Instant::now();
        let mut map = self.sessions.write().await;
        if let Some(entry) = map.get_mut(id) {
            entry.last_used = now;
            return entry.state.clone();
        }

        if map.len() >= self.limits.max_sessions.max(1) {
            evict_lru(&mut map);
        }
        let state = SessionHandle::default();
        map.insert(
            id.to_string(),
            Entry {
                state: state.clone(),
                last_used: now,
            },
        );
        state
    }

    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).map(|e| e.state.clone())
    }

    /// Returns `true` if the session existed.
    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions idle for longer than the configured TTL; returns how many.
    pub async fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now()).await
    }

    async fn sweep_idle_at(&self, now: Instant) -> usize {
        let ttl = self.limits.idle_ttl;
        let mut map = self.sessions.write().await;
        let before = map.len();
        map.retain(|_, e| now.saturating_duration_since(e.last_used) <= ttl);
        before - map.len()
    }
}

fn evict_lru(map: &mut HashMap<String, Entry>) {
    let oldest = map
        .iter()
        .min_by_key(|(_, e)| e.last_used)
        .map(|(id, _)| id.clone());
    if let Some(id) = oldest {
        debug!(session = %id, "session cap reached; evicting least recently used");
        map.remove(&id);
    }
}

/// Session ids are 1..=128 chars of `[A-Za-z0-9_-]`.
pub fn validate_session_id(id: &str) -> AppResult<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidField {
            field: "session_id",
            message: format!("expected 1..={MAX_SESSION_ID_LEN} characters of [A-Za-z0-9_-]"),
        })
    }
}
