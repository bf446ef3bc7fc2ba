//! Verification input schema.
//!
//! Validates the request's raw `variables` object field by field, reporting
//! the first failure in postcode, suburb, state order. String fields are
//! trimmed as part of validation, matching what callers see echoed back in
//! messages.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::messages::INVALID_INPUT;

/// Australian state and territory codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AuState {
    NSW,
    VIC,
    QLD,
    SA,
    WA,
    TAS,
    NT,
    ACT,
}

impl AuState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NSW => "NSW",
            Self::VIC => "VIC",
            Self::QLD => "QLD",
            Self::SA => "SA",
            Self::WA => "WA",
            Self::TAS => "TAS",
            Self::NT => "NT",
            Self::ACT => "ACT",
        }
    }
}

impl fmt::Display for AuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuState {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "NSW" => Ok(Self::NSW),
            "VIC" => Ok(Self::VIC),
            "QLD" => Ok(Self::QLD),
            "SA" => Ok(Self::SA),
            "WA" => Ok(Self::WA),
            "TAS" => Ok(Self::TAS),
            "NT" => Ok(Self::NT),
            "ACT" => Ok(Self::ACT),
            _ => Err(()),
        }
    }
}

/// A validated verification request: 4-digit postcode, bounded suburb text,
/// and a state code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateAddressInput {
    pub postcode: String,
    pub suburb: String,
    pub state: AuState,
}

/// Validate the raw `variables` object.
///
/// On failure returns the first applicable field message (postcode, suburb,
/// state), falling back to a generic message when `variables` is not even an
/// object. A missing or non-string field fails that field's own check.
pub(crate) fn validate_variables(variables: &Value) -> Result<ValidateAddressInput, String> {
    if !variables.is_object() {
        return Err(INVALID_INPUT.to_string());
    }

    let postcode = variables
        .get("postcode")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim();
    if !valid_postcode(postcode) {
        return Err("Postcode must be exactly 4 digits".to_string());
    }

    let suburb = variables
        .get("suburb")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim();
    if let Some(message) = suburb_error(suburb) {
        return Err(message.to_string());
    }

    let state = variables
        .get("state")
        .and_then(Value::as_str)
        .map(str::trim)
        .and_then(|value| AuState::from_str(value).ok());
    let Some(state) = state else {
        return Err("State is required".to_string());
    };

    Ok(ValidateAddressInput {
        postcode: postcode.to_string(),
        suburb: suburb.to_string(),
        state,
    })
}

fn valid_postcode(postcode: &str) -> bool {
    Regex::new(r"^\d{4}$").is_ok_and(|regex| regex.is_match(postcode))
}

fn suburb_error(suburb: &str) -> Option<&'static str> {
    if suburb.is_empty() {
        return Some("Suburb is required");
    }
    if suburb.chars().count() > 100 {
        return Some("Suburb must be less than 100 characters");
    }
    let charset_ok = Regex::new(r"^[a-zA-Z0-9\s'\-\.]+$")
        .is_ok_and(|regex| regex.is_match(suburb));
    if !charset_ok {
        return Some("Suburb can only contain letters, numbers, spaces, apostrophes, hyphens, and periods");
    }
    None
}
