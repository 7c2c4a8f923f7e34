//! Router-wide middleware: CORS, response hardening and request counting

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use quill_core::config::ServerConfig;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

/// Headers set on every response unless a handler already set them
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-xss-protection", "0"),
    ("x-dns-prefetch-control", "off"),
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains",
    ),
    ("referrer-policy", "no-referrer"),
    ("cross-origin-opener-policy", "same-origin"),
];

/// Add hardening headers to every response, error responses included
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for &(name, value) in SECURITY_HEADERS {
        if !headers.contains_key(name) {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
    }

    response
}

/// Count every request that reaches the router
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.increment_requests();
    next.run(request).await
}

/// CORS policy allowing the configured client origin with credentials
///
/// An unparsable `client_url` leaves cross-origin requests disallowed.
pub fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(server.client_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!(client_url = %server.client_url, error = %e, "Invalid client origin, CORS disabled");
            layer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        response::IntoResponse,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn hardened(router: Router) -> Router {
        router.layer(middleware::from_fn(security_headers))
    }

    #[tokio::test]
    async fn test_security_headers_added() {
        let app = hardened(Router::new().route("/ok", get(|| async { "ok" })));

        let response = app
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "SAMEORIGIN");
        assert_eq!(headers.get(header::REFERRER_POLICY).unwrap(), "no-referrer");
        assert_eq!(
            headers.get("cross-origin-opener-policy").unwrap(),
            "same-origin"
        );
    }

    #[tokio::test]
    async fn test_security_headers_on_error_and_preserved() {
        async fn handler() -> impl IntoResponse {
            (
                StatusCode::FORBIDDEN,
                [(header::X_FRAME_OPTIONS, "DENY")],
                "no",
            )
        }
        let app = hardened(Router::new().route("/deny", get(handler)));

        let response = app
            .oneshot(Request::builder().uri("/deny").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert!(response
            .headers()
            .get(header::STRICT_TRANSPORT_SECURITY)
            .is_some());
    }

    #[tokio::test]
    async fn test_cors_allows_client_origin() {
        let server = ServerConfig {
            client_url: "http://localhost:3000".to_string(),
            ..ServerConfig::default()
        };
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .layer(cors_layer(&server));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ok")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }
}
