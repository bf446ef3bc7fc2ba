//! Signup and login input validation.
//!
//! Errors carry the first failing field's message, checked in declaration
//! order (name, email, password, confirmation).

use super::types::{LoginRequest, SignupRequest};
use super::utils::{normalize_email, valid_email};

pub(crate) const USER_NAME_MIN_LENGTH: usize = 2;
pub(crate) const USER_NAME_MAX_LENGTH: usize = 50;
pub(crate) const PASSWORD_MIN_LENGTH: usize = 8;
pub(crate) const PASSWORD_MAX_LENGTH: usize = 32;

/// Special characters accepted (and required) in passwords.
pub(crate) const AVAILABLE_SPECIAL_CHARACTERS: &[char] = &[
    '@', '!', '#', '$', '%', '^', '&', '*', '_', '+', '=', '?', '-',
];

/// Validated, normalized signup fields.
#[derive(Debug)]
pub(crate) struct ValidSignup {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) password: String,
}

/// Validated, normalized login fields.
#[derive(Debug)]
pub(crate) struct ValidLogin {
    pub(crate) email: String,
    pub(crate) password: String,
}

pub(crate) fn validate_signup(request: &SignupRequest) -> Result<ValidSignup, String> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    if name.chars().count() < USER_NAME_MIN_LENGTH {
        return Err("Name must be at least 2 characters long".to_string());
    }
    if name.chars().count() > USER_NAME_MAX_LENGTH {
        return Err("Name must be at most 50 characters long".to_string());
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err("Invalid email address".to_string());
    }

    if let Some(message) = password_policy_error(&request.password) {
        return Err(message.to_string());
    }

    if request.password_confirm != request.password {
        return Err("Passwords do not match.".to_string());
    }

    Ok(ValidSignup {
        name: name.to_string(),
        email,
        password: request.password.clone(),
    })
}

pub(crate) fn validate_login(request: &LoginRequest) -> Result<ValidLogin, String> {
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err("Invalid email address".to_string());
    }

    if let Some(message) = password_policy_error(&request.password) {
        return Err(message.to_string());
    }

    Ok(ValidLogin {
        email,
        password: request.password.clone(),
    })
}

/// Password policy: 8-32 chars drawn from letters, digits and the special
/// set, with at least one of each class present.
fn password_policy_error(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        return Some("Password is required");
    }
    let length = password.chars().count();
    if length < PASSWORD_MIN_LENGTH {
        return Some("Password must be at least 8 characters long");
    }
    if length > PASSWORD_MAX_LENGTH {
        return Some("Password must be at most 32 characters long");
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| AVAILABLE_SPECIAL_CHARACTERS.contains(&c));
    let allowed_only = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || AVAILABLE_SPECIAL_CHARACTERS.contains(&c));

    if has_lower && has_upper && has_digit && has_special && allowed_only {
        None
    } else {
        Some("Password must include uppercase letters, lowercase letters, numbers, and special characters.")
    }
}
