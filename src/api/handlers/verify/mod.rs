//! The address verification pipeline.
//!
//! One handler orchestrates: rate limit by caller IP, session auth gate,
//! audit sink provisioning, input schema validation, the provider lookup,
//! the reconciliation algorithm, and a best-effort audit write. Every
//! branch, including internal failures, answers with the same JSON envelope.

pub mod algorithm;
pub mod audit;
pub mod input;
pub mod locality;
pub mod lookup;
pub(crate) mod messages;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::api::handlers::auth::rate_limit::RateLimitDecision;
use crate::api::handlers::auth::session::authenticate_session;
use crate::api::handlers::auth::store::UserSession;
use crate::api::handlers::auth::utils::extract_client_ip;
use crate::api::state::AppState;

use algorithm::{validate_address_data, ValidationResult};
use audit::LogEntry;
use input::{validate_variables, ValidateAddressInput};
use messages::{SERVER_ERROR, TOO_MANY_REQUESTS, UNAUTHORIZED};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateAddressRequest {
    /// The query variables: postcode, suburb and state.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub variables: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateAddressResponse {
    pub data: ValidateAddressData,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateAddressData {
    #[serde(rename = "validateAddress")]
    pub validate_address: AddressVerdict,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddressVerdict {
    pub success: bool,
    pub message: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[utoipa::path(
    post,
    path = "/v1/verify/address",
    request_body = ValidateAddressRequest,
    responses(
        (status = 200, description = "Address verified", body = ValidateAddressResponse),
        (status = 400, description = "Throttled, invalid input, or failed verification", body = ValidateAddressResponse),
        (status = 401, description = "No active session", body = ValidateAddressResponse),
        (status = 500, description = "Provider or internal failure", body = ValidateAddressResponse)
    ),
    tag = "verify"
)]
pub async fn validate_address(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<ValidateAddressRequest>>,
) -> Response {
    // Throttle before any other work. Neither throttled nor unauthenticated
    // requests produce an audit entry.
    let ip = extract_client_ip(&headers).unwrap_or_else(|| "unknown".to_string());
    if state.rate_limiter().check(&ip).await == RateLimitDecision::Limited {
        return envelope(&terminal(StatusCode::BAD_REQUEST, TOO_MANY_REQUESTS));
    }

    let session = match authenticate_session(&headers, &state).await {
        Ok(Some(session)) => session,
        Ok(None) => return envelope(&terminal(StatusCode::UNAUTHORIZED, UNAUTHORIZED)),
        Err(_) => return envelope(&terminal(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR)),
    };

    if let Err(err) = state.audit().ensure_index().await {
        error!("Failed to provision verification log table: {err}");
        return envelope(&terminal(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR));
    }

    let variables = match payload {
        Some(Json(request)) => request.variables.unwrap_or(Value::Null),
        None => Value::Null,
    };

    let input = match validate_variables(&variables) {
        Ok(input) => input,
        Err(message) => {
            // Schema failures are logged with the raw, unvalidated values.
            record_attempt(&state, raw_entry(&session, &variables, &message)).await;
            return envelope(&terminal(StatusCode::BAD_REQUEST, &message));
        }
    };

    let localities = match state.localities().lookup(&input.postcode, input.state).await {
        Ok(localities) => localities,
        Err(err) => {
            // The generic message is logged, never the upstream error body.
            error!("Locality lookup failed: {err}");
            record_attempt(
                &state,
                input_entry(&session, &input, false, Some(SERVER_ERROR.to_string())),
            )
            .await;
            return envelope(&terminal(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR));
        }
    };

    let result = validate_address_data(&localities, &input);

    let error_message = if result.success {
        None
    } else {
        Some(result.message.clone())
    };
    record_attempt(
        &state,
        input_entry(&session, &input, result.success, error_message),
    )
    .await;

    envelope(&result)
}

/// Best-effort append: the caller still gets their verdict if the sink is
/// down.
async fn record_attempt(state: &AppState, entry: LogEntry) {
    if let Err(err) = state.audit().append(&entry).await {
        error!("Failed to log verification attempt: {err}");
    }
}

fn terminal(status: StatusCode, message: &str) -> ValidationResult {
    ValidationResult {
        success: false,
        message: message.to_string(),
        latitude: None,
        longitude: None,
        status,
    }
}

fn envelope(result: &ValidationResult) -> Response {
    let body = ValidateAddressResponse {
        data: ValidateAddressData {
            validate_address: AddressVerdict {
                success: result.success,
                message: result.message.clone(),
                latitude: result.latitude,
                longitude: result.longitude,
            },
        },
    };
    (result.status, Json(body)).into_response()
}

fn raw_field(variables: &Value, field: &str) -> String {
    variables
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn raw_entry(session: &UserSession, variables: &Value, message: &str) -> LogEntry {
    LogEntry {
        user_id: session.user_id,
        postcode: raw_field(variables, "postcode"),
        suburb: raw_field(variables, "suburb"),
        state: raw_field(variables, "state"),
        timestamp: Utc::now(),
        success: false,
        error_message: Some(message.to_string()),
    }
}

fn input_entry(
    session: &UserSession,
    input: &ValidateAddressInput,
    success: bool,
    error_message: Option<String>,
) -> LogEntry {
    LogEntry {
        user_id: session.user_id,
        postcode: input.postcode.clone(),
        suburb: input.suburb.clone(),
        state: input.state.as_str().to_string(),
        timestamp: Utc::now(),
        success,
        error_message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::locality::Locality;
    use crate::api::handlers::test_support::{BlockedRateLimiter, TestApp};
    use serde_json::json;
    use std::sync::Arc;

    fn request(postcode: &str, suburb: &str, state: &str) -> ValidateAddressRequest {
        ValidateAddressRequest {
            variables: Some(json!({
                "postcode": postcode,
                "suburb": suburb,
                "state": state,
            })),
        }
    }

    async fn verdict(response: Response) -> (StatusCode, AddressVerdict) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let decoded: ValidateAddressResponse = serde_json::from_slice(&bytes).expect("envelope");
        (status, decoded.data.validate_address)
    }

    #[tokio::test]
    async fn unauthenticated_requests_get_401_and_no_log_entry() {
        let app = TestApp::new();
        let response = validate_address(
            HeaderMap::new(),
            Extension(app.state.clone()),
            Some(Json(request("2000", "Sydney", "NSW"))),
        )
        .await;

        let (status, verdict) = verdict(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!verdict.success);
        assert_eq!(verdict.message, "Unauthorized");
        assert!(app.audit.entries().await.is_empty());
    }

    #[tokio::test]
    async fn throttled_requests_get_400_and_no_log_entry() {
        let app = TestApp::new().with_rate_limiter(Arc::new(BlockedRateLimiter));
        let (_, headers) = app.signed_in("Alice").await;

        let response = validate_address(
            headers,
            Extension(app.state.clone()),
            Some(Json(request("2000", "Sydney", "NSW"))),
        )
        .await;

        let (status, verdict) = verdict(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(verdict.message.contains("Too many requests"));
        assert!(app.audit.entries().await.is_empty());
    }

    #[tokio::test]
    async fn schema_failures_are_logged_with_raw_values() {
        let app = TestApp::new();
        let (user_id, headers) = app.signed_in("Alice").await;

        let response = validate_address(
            headers,
            Extension(app.state.clone()),
            Some(Json(request("20", "Sydney", "NSW"))),
        )
        .await;

        let (status, verdict) = verdict(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(verdict.message, "Postcode must be exactly 4 digits");

        let entries = app.audit.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, user_id);
        assert_eq!(entries[0].postcode, "20");
        assert!(!entries[0].success);
        assert_eq!(
            entries[0].error_message.as_deref(),
            Some("Postcode must be exactly 4 digits")
        );
    }

    #[tokio::test]
    async fn missing_payload_follows_the_schema_failure_path() {
        let app = TestApp::new();
        let (_, headers) = app.signed_in("Alice").await;

        let response = validate_address(headers, Extension(app.state.clone()), None).await;

        let (status, verdict) = verdict(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(verdict.message, "Invalid input");
        // Logged with empty raw fields; nothing better is known.
        let entries = app.audit.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].postcode, "");
    }

    #[tokio::test]
    async fn provider_failures_become_generic_500s() {
        let app = TestApp::new().with_failing_lookup();
        let (_, headers) = app.signed_in("Alice").await;

        let response = validate_address(
            headers,
            Extension(app.state.clone()),
            Some(Json(request("2000", "Sydney", "NSW"))),
        )
        .await;

        let (status, verdict) = verdict(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            verdict.message,
            "Internal server error. Please try again later."
        );

        // Logged with the generic message, not the upstream error.
        let entries = app.audit.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].error_message.as_deref(),
            Some("Internal server error. Please try again later.")
        );
    }

    #[tokio::test]
    async fn matched_address_succeeds_with_coordinates_and_log_entry() {
        let app = TestApp::new().with_localities(vec![
            Locality::named("Sydney", "NSW").with_coordinates(-33.8688, 151.2093)
        ]);
        let (user_id, headers) = app.signed_in("Alice").await;

        let response = validate_address(
            headers,
            Extension(app.state.clone()),
            Some(Json(request("2000", "Sydney", "NSW"))),
        )
        .await;

        let (status, verdict) = verdict(response).await;
        assert_eq!(status, StatusCode::OK);
        assert!(verdict.success);
        assert_eq!(
            verdict.message,
            "The postcode, suburb, and state input are valid."
        );
        assert_eq!(verdict.latitude, Some(-33.8688));
        assert_eq!(verdict.longitude, Some(151.2093));

        let entries = app.audit.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, user_id);
        assert!(entries[0].success);
        assert_eq!(entries[0].error_message, None);
        // The sink was provisioned before the write.
        assert_eq!(app.audit.ensure_calls(), 1);
    }

    #[tokio::test]
    async fn match_without_coordinates_returns_nulls() {
        let app = TestApp::new().with_localities(vec![Locality::named("Melbourne", "VIC")]);
        let (_, headers) = app.signed_in("Alice").await;

        let response = validate_address(
            headers,
            Extension(app.state.clone()),
            Some(Json(request("3000", "Melbourne", "VIC"))),
        )
        .await;

        let (status, verdict) = verdict(response).await;
        assert_eq!(status, StatusCode::OK);
        assert!(verdict.success);
        assert_eq!(verdict.latitude, None);
        assert_eq!(verdict.longitude, None);
    }

    #[tokio::test]
    async fn business_failures_are_400_and_logged() {
        let app = TestApp::new().with_localities(vec![Locality::named("Ferntree Gully", "VIC")]);
        let (_, headers) = app.signed_in("Alice").await;

        let response = validate_address(
            headers,
            Extension(app.state.clone()),
            Some(Json(request("3156", "Ferntree Gully", "TAS"))),
        )
        .await;

        let (status, verdict) = verdict(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            verdict.message,
            "The suburb Ferntree Gully does not exist in the state (TAS)."
        );

        let entries = app.audit.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].error_message.as_deref(),
            Some("The suburb Ferntree Gully does not exist in the state (TAS).")
        );
    }

    #[tokio::test]
    async fn audit_entries_are_queryable_by_user_and_time() {
        use crate::api::handlers::verify::audit::AuditSink;

        let app = TestApp::new().with_localities(vec![Locality::named("Sydney", "NSW")]);
        let (user_id, headers) = app.signed_in("Alice").await;

        for suburb in ["Sydney", "Broadway"] {
            let _ = validate_address(
                headers.clone(),
                Extension(app.state.clone()),
                Some(Json(request("2000", suburb, "NSW"))),
            )
            .await;
        }

        let since = chrono::DateTime::<chrono::Utc>::MIN_UTC;
        let entries = app
            .audit
            .entries_for_user(user_id, since)
            .await
            .expect("query entries");
        assert_eq!(entries.len(), 2);

        let other_user = app
            .audit
            .entries_for_user(uuid::Uuid::new_v4(), since)
            .await
            .expect("query entries");
        assert!(other_user.is_empty());
    }

    #[tokio::test]
    async fn sink_failures_never_affect_the_verdict() {
        let app = TestApp::new().with_localities(vec![Locality::named("Sydney", "NSW")]);
        app.audit.fail_appends(true);
        let (_, headers) = app.signed_in("Alice").await;

        let response = validate_address(
            headers,
            Extension(app.state.clone()),
            Some(Json(request("2000", "Sydney", "NSW"))),
        )
        .await;

        let (status, verdict) = verdict(response).await;
        assert_eq!(status, StatusCode::OK);
        assert!(verdict.success);
        assert!(app.audit.entries().await.is_empty());
    }

    #[tokio::test]
    async fn envelope_serializes_null_coordinates() {
        let result = terminal(StatusCode::BAD_REQUEST, "nope");
        let response = envelope(&result);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(value["data"]["validateAddress"]["latitude"], Value::Null);
        assert_eq!(value["data"]["validateAddress"]["longitude"], Value::Null);
        assert_eq!(value["data"]["validateAddress"]["success"], Value::Bool(false));
    }
}
