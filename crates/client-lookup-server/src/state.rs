//! Shared application state
//!
//! Sessions live only in this process: a restart ends every session and
//! discards any session-override tables with them. Each session expires a
//! fixed time after its last login; expired entries are dropped when they
//! are next presented and on every login.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use client_lookup_core::{LookupService, Session};

use crate::error::ApiError;

/// Default session lifetime
pub const DEFAULT_SESSION_TTL_MINS: i64 = 8 * 60;

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub session: Session,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-memory session table keyed by session id
pub type SessionStore = Arc<RwLock<HashMap<Uuid, SessionEntry>>>;

pub fn create_session_store() -> SessionStore {
    Arc::new(RwLock::new(HashMap::new()))
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LookupService>,
    pub sessions: SessionStore,
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new(service: LookupService, max_upload_bytes: usize) -> Self {
        Self {
            service: Arc::new(service),
            sessions: create_session_store(),
            max_upload_bytes,
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINS),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Look up the caller's session from `Authorization: Bearer <id>`.
    ///
    /// An expired session is removed and treated as unknown.
    pub async fn session(&self, headers: &HeaderMap) -> Result<Session, ApiError> {
        let id = bearer_session_id(headers).ok_or_else(ApiError::unauthenticated)?;
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                Some(entry) if !entry.is_expired(now) => return Ok(entry.session.clone()),
                Some(_) => {}
                None => return Err(ApiError::unauthenticated()),
            }
        }

        let mut sessions = self.sessions.write().await;
        if sessions.get(&id).is_some_and(|entry| entry.is_expired(now)) {
            sessions.remove(&id);
            tracing::info!(session = %id, "Session expired");
        }
        Err(ApiError::unauthenticated())
    }

    /// Store a freshly authenticated session, restarting its lifetime.
    /// Returns when it will expire.
    pub async fn start_session(&self, session: Session) -> DateTime<Utc> {
        let now = Utc::now();
        let expires_at = now + self.session_ttl;
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted expired sessions");
        }

        let created_at = sessions
            .get(&session.id())
            .map_or(now, |entry| entry.created_at);
        sessions.insert(
            session.id(),
            SessionEntry {
                session,
                created_at,
                expires_at,
            },
        );
        expires_at
    }

    /// Replace a live session with its successor.
    ///
    /// Fails with 401 if the session ended or expired while the request
    /// was in flight; the successor is discarded.
    pub async fn replace_session(&self, next: Session) -> Result<(), ApiError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&next.id()) {
            Some(entry) if !entry.is_expired(now) => {
                entry.session = next;
                Ok(())
            }
            Some(_) => {
                sessions.remove(&next.id());
                Err(ApiError::unauthenticated())
            }
            None => Err(ApiError::unauthenticated()),
        }
    }

    pub async fn end_session(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }
}

fn bearer_session_id(headers: &HeaderMap) -> Option<Uuid> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    Uuid::parse_str(token.trim()).ok()
}
