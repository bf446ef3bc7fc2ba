//! Browser-navigation guard.
//!
//! Unauthenticated navigations outside the guest routes redirect to the
//! login page; authenticated navigations to a guest route redirect home.
//! The guard resolves sessions read-only: it runs on every navigation and
//! never touches token generation or cookie issuance.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::error;

use crate::api::state::AppState;

use super::session::extract_session_token;
use super::store::UserSession;
use super::utils::hash_session_token;

/// Routes reachable without a session; a signed-in user is bounced home.
const GUEST_ROUTES: [&str; 2] = ["/login", "/signup"];

fn is_guest_route(path: &str) -> bool {
    GUEST_ROUTES.contains(&path)
}

/// Paths outside the browser-navigation surface; they enforce their own auth.
fn is_exempt(path: &str) -> bool {
    path == "/health"
        || path.starts_with("/v1/")
        || path.starts_with("/swagger-ui")
        || path.starts_with("/api-docs")
}

/// Where to redirect a navigation, if anywhere.
pub(crate) fn guard_decision(path: &str, authenticated: bool) -> Option<&'static str> {
    if is_exempt(path) {
        return None;
    }
    if !authenticated && !is_guest_route(path) {
        return Some("/login");
    }
    if authenticated && is_guest_route(path) {
        return Some("/");
    }
    None
}

/// Read-only session resolver with the same contract as
/// `session::authenticate_session`. Store errors count as "not signed in"
/// so a navigation never turns into a hard failure.
async fn resolve_session(headers: &HeaderMap, state: &AppState) -> Option<UserSession> {
    let token = extract_session_token(headers)?;
    let token_hash = hash_session_token(&token);
    match state.sessions().get(&token_hash).await {
        Ok(session) => session,
        Err(err) => {
            error!("Failed to lookup session: {err}");
            None
        }
    }
}

pub async fn guard(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let session = resolve_session(request.headers(), &state).await;

    match guard_decision(&path, session.is_some()) {
        Some(target) => Redirect::to(target).into_response(),
        None => next.run(request).await,
    }
}
