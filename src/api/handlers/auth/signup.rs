//! Signup endpoint: credential creation plus immediate session issuance.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::api::state::AppState;

use super::session::create_session;
use super::store::{InsertUserOutcome, NewUser, UserSession};
use super::types::{SessionResponse, SignupRequest};
use super::validation::validate_signup;

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created and signed in", body = SessionResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 409, description = "User already exists", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "auth"
)]
pub async fn signup(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SignupRequest>>,
) -> impl IntoResponse {
    let request: SignupRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let valid = match validate_signup(&request) {
        Ok(valid) => valid,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    // Friendly pre-check; the unique index still backstops concurrent signups.
    match state.credentials().find_by_email(&valid.email).await {
        Ok(Some(_)) => {
            return (StatusCode::CONFLICT, "User already exists".to_string()).into_response()
        }
        Ok(None) => {}
        Err(err) => {
            error!("Failed to lookup user by email: {err}");
            return server_error();
        }
    }

    let password_hash = match bcrypt::hash(&valid.password, state.config().hash_cost()) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return server_error();
        }
    };

    let user = NewUser {
        id: Uuid::new_v4(),
        name: valid.name,
        email: valid.email,
        password_hash,
    };

    match state.credentials().insert(&user).await {
        Ok(InsertUserOutcome::Created) => {}
        Ok(InsertUserOutcome::Conflict) => {
            return (StatusCode::CONFLICT, "User already exists".to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to insert user: {err}");
            return server_error();
        }
    }

    let session = UserSession {
        user_id: user.id,
        name: user.name.clone(),
    };
    let cookie = match create_session(&state, &session).await {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to create session: {err}");
            return server_error();
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    let response = SessionResponse {
        user_id: user.id.to_string(),
        name: user.name,
    };
    (StatusCode::CREATED, headers, Json(response)).into_response()
}

fn server_error() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error. Please try again later.".to_string(),
    )
        .into_response()
}
