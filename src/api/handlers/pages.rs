//! Minimal page shells.
//!
//! Page rendering lives in the frontend; these shells exist so the
//! navigation guard has real routes to protect and redirect between.

use axum::response::Html;

pub async fn home() -> Html<&'static str> {
    Html(
        "<!doctype html>\
         <html><head><title>Address Verifier</title></head>\
         <body><h1>Address Verifier</h1></body></html>",
    )
}

pub async fn login() -> Html<&'static str> {
    Html(
        "<!doctype html>\
         <html><head><title>Log in</title></head>\
         <body><h1>Log in</h1></body></html>",
    )
}

pub async fn signup() -> Html<&'static str> {
    Html(
        "<!doctype html>\
         <html><head><title>Sign up</title></head>\
         <body><h1>Sign up</h1></body></html>",
    )
}
