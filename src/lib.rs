//! # Veripost (Australian address verification)
//!
//! `veripost` verifies postcode/suburb/state triples against an external
//! locality provider. Authenticated users submit a triple and receive a
//! validity verdict plus map coordinates when the provider has them.
//!
//! ## Request pipeline
//!
//! Every verification request passes through, in order: an IP sliding-window
//! rate limit, the session auth gate, input schema validation, the locality
//! provider lookup, the reconciliation algorithm, and a best-effort audit
//! log write. Each stage short-circuits with a well-formed JSON envelope;
//! no stage leaks a raw error to the caller.
//!
//! ## Sessions
//!
//! Sessions are opaque 256-bit tokens carried in an `HttpOnly` cookie. The
//! database stores only a hash of the token, with a fixed TTL enforced at
//! lookup time. Logout is idempotent.
//!
//! ## Audit log
//!
//! Every verification attempt (including schema failures) is appended to an
//! immutable log, queryable by user and time. Writes are best-effort: a sink
//! failure never affects the caller's response.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
