//! Explicit caller context.
//!
//! Handlers never read ambient state: the acting user arrives as a
//! [`Caller`] extractor resolved from the `X-Session-Token` header
//! through the in-process session store. Issuing sessions (login) is
//! outside this service's scope; tests and surrounding infrastructure
//! call [`issue_session`] directly.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use model::entities::user;
use moka::future::Cache;
use sea_orm::EntityTrait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::schemas::AppState;

/// Header carrying the session token.
pub const SESSION_HEADER: &str = "x-session-token";

/// A live session entry in the session store.
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: i32,
    pub issued_at: DateTime<Utc>,
}

/// The account attached to the current request's authentication context.
#[derive(Clone, Debug)]
pub struct Caller {
    pub id: i32,
    pub username: String,
    /// Session token the caller authenticated with; keys the notice queue.
    pub token: String,
}

/// Create a session for the given user and return its token.
pub async fn issue_session(sessions: &Cache<String, Session>, user_id: i32) -> String {
    let token = Uuid::new_v4().to_string();
    let session = Session {
        user_id,
        issued_at: Utc::now(),
    };
    debug!("issuing session for user {} at {}", user_id, session.issued_at);
    sessions.insert(token.clone(), session).await;
    token
}

/// Build a `302 Found` response to the given location.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Redirect an unauthenticated caller to the login prompt, preserving
/// the originally requested path in the `next` query parameter.
pub fn login_redirect(login_url: &str, next: &str) -> Response {
    found(&format!("{login_url}?next={next}"))
}

async fn caller_from_parts(parts: &Parts, state: &AppState) -> Option<Caller> {
    let token = parts
        .headers
        .get(SESSION_HEADER)?
        .to_str()
        .ok()?
        .to_string();

    let session = state.sessions.get(&token).await?;

    match user::Entity::find_by_id(session.user_id).one(&state.db).await {
        Ok(Some(user_model)) => Some(Caller {
            id: user_model.id,
            username: user_model.username,
            token,
        }),
        Ok(None) => {
            // Session outlived its account; treat as unauthenticated.
            warn!("session references missing user {}", session.user_id);
            state.sessions.invalidate(&token).await;
            None
        }
        Err(db_error) => {
            warn!("failed to resolve session user: {}", db_error);
            None
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match caller_from_parts(parts, state).await {
            Some(caller) => Ok(caller),
            None => Err(login_redirect(&state.config.login_url, parts.uri.path())),
        }
    }
}
