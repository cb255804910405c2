//! Integration tests for Aquarium Studio.
//!
//! The storefront and admin routers are driven in-process with
//! `tower::ServiceExt::oneshot` against the in-memory table store, so no
//! database or Supabase project is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p aquarium-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront` - Catalog, cart and checkout flows
//! - `admin` - Product management and orders

use aquarium_supabase::RemoteConfig;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use tower::ServiceExt;

/// A project URL and key that resolve to live mode.
#[must_use]
pub fn live_remote() -> RemoteConfig {
    match RemoteConfig::resolve(Some("https://shop.supabase.co"), Some("anon-test-key"), None) {
        Ok(remote) => remote,
        Err(e) => panic!("test remote config is invalid: {e}"),
    }
}

/// A response with its body read to a string.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// Sends requests to a router, carrying the session cookie between them.
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
}

impl TestClient {
    #[must_use]
    pub const fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    /// Send a GET request.
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::get(uri), Body::empty()).await
    }

    /// Send a GET request marked as coming from HTMX.
    pub async fn get_htmx(&mut self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).header("hx-request", "true"), Body::empty())
            .await
    }

    /// Send a url-encoded form POST.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(
            Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(body),
        )
        .await
    }

    async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let builder = match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        };
        let request = match builder.body(body) {
            Ok(request) => request,
            Err(e) => panic!("invalid test request: {e}"),
        };
        let response = match self.app.clone().oneshot(request).await {
            Ok(response) => response,
            Err(e) => match e {},
        };

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            && let Some(pair) = set_cookie.split(';').next()
        {
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = match to_bytes(response.into_body(), usize::MAX).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => panic!("failed to read response body: {e}"),
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }
}
