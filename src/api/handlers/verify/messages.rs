//! User-facing messages for the verification pipeline.
//!
//! The exact wording is part of the API contract; clients display these
//! strings verbatim.

pub(crate) const UNAUTHORIZED: &str = "Unauthorized";
pub(crate) const INVALID_INPUT: &str = "Invalid input";
pub(crate) const SERVER_ERROR: &str = "Internal server error. Please try again later.";
pub(crate) const TOO_MANY_REQUESTS: &str = "Too many requests. Please try again later.";
pub(crate) const VALIDATION_SUCCESS: &str = "The postcode, suburb, and state input are valid.";

pub(crate) fn no_results_for_postcode(postcode: &str, state: &str) -> String {
    format!("No results found for postcode {postcode} in state {state}.")
}

pub(crate) fn postcode_suburb_mismatch(postcode: &str, suburb: &str) -> String {
    format!("The postcode {postcode} does not match the suburb {suburb}.")
}

pub(crate) fn suburb_state_mismatch(suburb: &str, state: &str) -> String {
    format!("The suburb {suburb} does not exist in the state ({state}).")
}
