//! Login endpoint.
//!
//! Unknown emails and wrong passwords produce the same answer so callers
//! cannot enumerate accounts.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::error;

use crate::api::state::AppState;

use super::session::{authenticate_session, create_session};
use super::store::UserSession;
use super::types::{LoginRequest, SessionResponse};
use super::validation::validate_login;

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Validation error or already authenticated", body = String),
        (status = 401, description = "Invalid credentials", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let valid = match validate_login(&request) {
        Ok(valid) => valid,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    // Signed-in callers cannot log in again.
    match authenticate_session(&headers, &state).await {
        Ok(Some(_)) => {
            return (StatusCode::BAD_REQUEST, "Already authenticated".to_string()).into_response()
        }
        Ok(None) => {}
        Err(_) => return server_error(),
    }

    let user = match state.credentials().find_by_email(&valid.email).await {
        Ok(Some(user)) => user,
        // Same answer as a wrong password.
        Ok(None) => return invalid_credentials(),
        Err(err) => {
            error!("Failed to lookup user by email: {err}");
            return server_error();
        }
    };

    let password_ok = match bcrypt::verify(&valid.password, &user.password_hash) {
        Ok(ok) => ok,
        Err(err) => {
            error!("Failed to verify password: {err}");
            return server_error();
        }
    };
    if !password_ok {
        return invalid_credentials();
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

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, cookie);
    let response = SessionResponse {
        user_id: user.id.to_string(),
        name: user.name,
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}

fn invalid_credentials() -> axum::response::Response {
    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()).into_response()
}

fn server_error() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error. Please try again later.".to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_support::TestApp;

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn login_succeeds_with_valid_credentials() {
        let app = TestApp::new();
        app.register_user("Alice", "alice@example.com", "Str0ng@pass")
            .await;

        let response = login(
            HeaderMap::new(),
            Extension(app.state.clone()),
            Some(Json(login_request("alice@example.com", "Str0ng@pass"))),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(SET_COOKIE));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let app = TestApp::new();
        app.register_user("Alice", "alice@example.com", "Str0ng@pass")
            .await;

        let missing = login(
            HeaderMap::new(),
            Extension(app.state.clone()),
            Some(Json(login_request("nobody@example.com", "Str0ng@pass"))),
        )
        .await
        .into_response();
        let wrong = login(
            HeaderMap::new(),
            Extension(app.state.clone()),
            Some(Json(login_request("alice@example.com", "Wr0ng@pass1"))),
        )
        .await
        .into_response();

        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        let missing_body = body_string(missing).await;
        let wrong_body = body_string(wrong).await;
        assert_eq!(missing_body, wrong_body);
        assert_eq!(missing_body, "Invalid credentials");
    }

    #[tokio::test]
    async fn login_rejects_already_authenticated_callers() {
        let app = TestApp::new();
        app.register_user("Alice", "alice@example.com", "Str0ng@pass")
            .await;
        let (_, headers) = app.signed_in("Alice").await;

        let response = login(
            headers,
            Extension(app.state.clone()),
            Some(Json(login_request("alice@example.com", "Str0ng@pass"))),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "Already authenticated");
    }

    #[tokio::test]
    async fn login_rejects_invalid_input_before_lookup() {
        let app = TestApp::new();
        let response = login(
            HeaderMap::new(),
            Extension(app.state.clone()),
            Some(Json(login_request("not-an-email", "Str0ng@pass"))),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "Invalid email address");
    }
}
