//! OpenAPI document for the JSON endpoints.

use utoipa::OpenApi;

use super::handlers::{auth, health, verify};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::session::session,
        auth::session::logout,
        auth::signup::signup,
        auth::login::login,
        verify::validate_address,
    ),
    components(schemas(
        auth::types::SignupRequest,
        auth::types::LoginRequest,
        auth::types::SessionResponse,
        verify::ValidateAddressRequest,
        verify::ValidateAddressResponse,
        verify::ValidateAddressData,
        verify::AddressVerdict,
    )),
    tags(
        (name = "auth", description = "Sessions and the credential lifecycle"),
        (name = "verify", description = "Address verification pipeline"),
        (name = "health", description = "Service metadata")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn openapi_document_lists_all_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for path in [
            "/health",
            "/v1/auth/session",
            "/v1/auth/logout",
            "/v1/auth/signup",
            "/v1/auth/login",
            "/v1/verify/address",
        ] {
            assert!(paths.contains(&path), "missing {path} in {paths:?}");
        }
    }
}
