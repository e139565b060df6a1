use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use axum::{
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{access::Session, api::AppState};

/// Bearer token a caller presented, available to handlers via request
/// extensions when the token resolved to a live session.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Live login sessions keyed by opaque token. Tokens are never persisted;
/// a restart logs everyone out.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, session: Session) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(token.clone(), session);
        token
    }

    pub fn resolve(&self, token: &str) -> Option<Session> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(token).cloned()
    }

    /// Returns whether the token was live.
    pub fn revoke(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Serialize)]
struct AuthError {
    success: bool,
    error: String,
}

/// Resolves the caller's session. Requests without a token run as visitors;
/// a token that does not resolve is rejected outright.
pub async fn session_middleware<B>(
    State(state): State<Arc<AppState>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Response {
    let token = req
        .headers()
        .get("X-Session-Token")
        .or_else(|| req.headers().get(header::AUTHORIZATION))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.strip_prefix("Bearer ").unwrap_or(s).to_string());

    match token {
        Some(token) => match state.sessions.resolve(&token) {
            Some(session) => {
                tracing::debug!(role = %session.role(), "Authenticated request");
                req.extensions_mut().insert(session);
                req.extensions_mut().insert(SessionToken(token));
                next.run(req).await
            }
            None => {
                tracing::warn!("Unknown session token presented");
                (
                    StatusCode::UNAUTHORIZED,
                    Json(AuthError {
                        success: false,
                        error: "Unknown or expired session token".to_string(),
                    }),
                )
                    .into_response()
            }
        },
        None => {
            req.extensions_mut().insert(Session::visitor());
            next.run(req).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_resolve_until_revoked() {
        let registry = SessionRegistry::new();
        let token = registry.issue(Session::visitor());

        assert!(registry.resolve(&token).is_some());
        assert!(registry.revoke(&token));
        assert!(registry.resolve(&token).is_none());
        assert!(!registry.revoke(&token));
    }

    #[test]
    fn tokens_are_distinct() {
        let registry = SessionRegistry::new();
        let a = registry.issue(Session::visitor());
        let b = registry.issue(Session::visitor());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }
}
