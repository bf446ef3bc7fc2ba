//! Session management, route guarding, and the credential lifecycle.
//!
//! Sessions are opaque 256-bit tokens set as `HttpOnly` cookies; the store
//! only ever sees a hash of the token. The route guard is a read-only
//! consumer of the same store. Signup and login issue sessions through the
//! one manager in `session`.

pub(crate) mod guard;
pub(crate) mod login;
pub mod rate_limit;
pub(crate) mod session;
pub(crate) mod signup;
pub mod store;
pub(crate) mod types;
pub(crate) mod utils;
pub(crate) mod validation;

pub use rate_limit::{NoopRateLimiter, PgRateLimiter, RateLimiter};
pub use store::{PgCredentialStore, PgSessionStore};
