//! Session lifecycle handlers
//!
//! Each session id maps to one [`SessionContext`]. Sessions live until they
//! are deleted or the process exits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{get_session_id, AppError, AppState, SuccessResponse};
use zytra_core::{Outcome, SessionContext, View};

/// In-memory session registry
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionContext>>,
    counter: AtomicU64,
    default_horizon: usize,
}

impl SessionManager {
    pub fn new(default_horizon: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
            default_horizon,
        }
    }

    /// Create a new session and return its ID
    pub async fn create_session(&self) -> String {
        // Unique ID from timestamp + counter
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut hasher = Sha256::new();
        hasher.update(timestamp.to_le_bytes());
        hasher.update(count.to_le_bytes());
        let hash = hasher.finalize();
        let session_id = format!("zs_{:x}", hash)[..35].to_string();

        let mut sessions = self.sessions.write().await;
        sessions.insert(
            session_id.clone(),
            SessionContext::new(self.default_horizon),
        );
        debug!(active = sessions.len(), "Session created");
        session_id
    }

    /// Delete a session
    pub async fn delete_session(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).is_some()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Run `f` against a session, if it exists
    pub async fn read<R>(&self, session_id: &str, f: impl FnOnce(&SessionContext) -> R) -> Option<R> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(f)
    }

    /// Run `f` against a session mutably, if it exists
    pub async fn update<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionContext) -> R,
    ) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(session_id).map(f)
    }
}

pub(crate) fn unknown_session() -> AppError {
    AppError::not_found("Unknown session")
}

/// Response for session creation
#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub view: View,
}

/// POST /api/session - Start a new session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let session_id = state.sessions.create_session().await;
    let view = state
        .sessions
        .read(&session_id, |ctx| ctx.render())
        .await
        .ok_or_else(unknown_session)?;
    info!("Session started");
    Ok(Json(CreateSessionResponse { session_id, view }))
}

/// DELETE /api/session - End the current session
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let session_id = get_session_id(&headers)?;
    if !state.sessions.delete_session(&session_id).await {
        return Err(unknown_session());
    }
    info!("Session ended");
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/view - Current view and last notice
pub async fn get_view(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Outcome>, AppError> {
    let session_id = get_session_id(&headers)?;
    let outcome = state
        .sessions
        .read(&session_id, |ctx| Outcome {
            notice: ctx.notice().cloned(),
            view: ctx.render(),
        })
        .await
        .ok_or_else(unknown_session)?;
    Ok(Json(outcome))
}

/// GET /api/health - Liveness check
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len().await,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_ids_are_unique() {
        let manager = SessionManager::new(30);
        let a = manager.create_session().await;
        let b = manager.create_session().await;

        assert_ne!(a, b);
        assert!(a.starts_with("zs_"));
        assert_eq!(a.len(), 35);
        assert_eq!(manager.len().await, 2);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let manager = SessionManager::new(30);
        let id = manager.create_session().await;

        assert!(manager.delete_session(&id).await);
        assert!(!manager.delete_session(&id).await);
        assert!(manager.read(&id, |_| ()).await.is_none());
    }
}
