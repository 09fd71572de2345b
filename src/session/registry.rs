use super::channel::ChannelHandle;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A live client connection reachable through its session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub channel: ChannelHandle,
    pub created_at: DateTime<Utc>,
}

/// Process-wide table of session token -> duplex channel.
///
/// The lock is held only while the map itself is touched; callers get a
/// cloned [`ChannelHandle`] and do their I/O after the guard is released.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh opaque session token.
    pub fn issue_token() -> String {
        Uuid::new_v4().to_string()
    }

    /// Register `channel` under `token`, replacing any previous entry.
    pub fn register(&self, token: impl Into<String>, channel: ChannelHandle) {
        let token = token.into();
        let session = Session {
            token: token.clone(),
            channel,
            created_at: Utc::now(),
        };
        if self.sessions.lock().insert(token.clone(), session).is_some() {
            tracing::warn!(ws_id = %token, "session token re-registered");
        }
    }

    /// Find the open channel for `token`.
    ///
    /// `None` means there is no one to notify: the token is unknown, was
    /// removed, or its connection has already gone away.
    pub fn lookup(&self, token: &str) -> Option<ChannelHandle> {
        let channel = self.sessions.lock().get(token).map(|s| s.channel.clone())?;
        (!channel.is_closed()).then_some(channel)
    }

    pub fn session(&self, token: &str) -> Option<Session> {
        self.sessions.lock().get(token).cloned()
    }

    pub fn unregister(&self, token: &str) -> Option<Session> {
        self.sessions.lock().remove(token)
    }

    /// Register `channel` under a new token and return a guard that removes it on drop.
    pub fn open_session(&self, channel: ChannelHandle) -> SessionGuard {
        let token = Self::issue_token();
        self.register(token.clone(), channel);
        SessionGuard {
            registry: self.clone(),
            token,
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.sessions.lock().contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

/// Keeps a session registered for as long as the connection lives.
#[derive(Debug)]
pub struct SessionGuard {
    registry: SessionRegistry,
    token: String,
}

impl SessionGuard {
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.token);
        tracing::debug!(ws_id = %self.token, "session unregistered");
    }
}
