//! The address reconciliation algorithm.
//!
//! Pure and deterministic: given the provider's localities and the caller's
//! input, produce a terminal verdict. Checks run most-general first so the
//! caller gets the most specific error the data supports: does the postcode
//! return anything at all, does the suburb appear in it, is the suburb in
//! the claimed state.

use axum::http::StatusCode;

use super::input::ValidateAddressInput;
use super::locality::Locality;
use super::messages::{
    no_results_for_postcode, postcode_suburb_mismatch, suburb_state_mismatch, VALIDATION_SUCCESS,
};

/// Outcome of one verification. Also the record the audit log captures.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub success: bool,
    pub message: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: StatusCode,
}

impl ValidationResult {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            message,
            latitude: None,
            longitude: None,
            status: StatusCode::BAD_REQUEST,
        }
    }
}

/// Reconcile the provider's localities against the caller's input.
pub fn validate_address_data(
    localities: &[Locality],
    input: &ValidateAddressInput,
) -> ValidationResult {
    if localities.is_empty() {
        return ValidationResult::failure(no_results_for_postcode(
            &input.postcode,
            input.state.as_str(),
        ));
    }

    // First match wins; provider order is preserved.
    let matched = localities
        .iter()
        .find(|locality| normalized_eq(locality.suburb_name(), &input.suburb));
    let Some(matched) = matched else {
        return ValidationResult::failure(postcode_suburb_mismatch(&input.postcode, &input.suburb));
    };

    if !normalized_eq(&matched.state, input.state.as_str()) {
        return ValidationResult::failure(suburb_state_mismatch(
            &input.suburb,
            input.state.as_str(),
        ));
    }

    ValidationResult {
        success: true,
        message: VALIDATION_SUCCESS.to_string(),
        latitude: matched.latitude,
        longitude: matched.longitude,
        status: StatusCode::OK,
    }
}

/// Trimmed, case-insensitive comparison.
fn normalized_eq(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
