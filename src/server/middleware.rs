use super::error::{internal_error_body, ApiError, InternalError};
use super::{AppState, AuthMode};
use crate::auth::FirebaseTokenClaims;
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderName, HeaderValue, InvalidHeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::any::Any;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error};

/// Who made the request, as established by [`require_auth`].
#[derive(Debug, Clone)]
pub enum Caller {
    /// Development mode without Firebase; no identity was checked.
    Anonymous,
    User(Arc<FirebaseTokenClaims>),
}

/// Establishes the caller for protected routes.
///
/// Degraded mode (Firebase was requested but failed to initialize) refuses the
/// request rather than letting it through unauthenticated.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = match state.mode {
        AuthMode::Development => Caller::Anonymous,
        AuthMode::Degraded => return Err(ApiError::FirebaseUnavailable),
        AuthMode::Authenticated => {
            let verifier = state
                .verifier
                .as_ref()
                .ok_or(ApiError::FirebaseUnavailable)?;
            let token = bearer_token(req.headers().get(header::AUTHORIZATION))
                .ok_or(ApiError::Unauthorized("Missing bearer token"))?;
            let claims = verifier.verify(token).await.map_err(|e| {
                debug!(error = %e, "rejected ID token");
                ApiError::Unauthorized("Invalid or expired token")
            })?;
            Caller::User(Arc::new(claims))
        }
    };

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    let value = value?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Renders responses flagged with [`InternalError`] as the JSON error body, and logs them.
pub async fn render_internal_errors(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    match response.extensions().get::<InternalError>() {
        Some(InternalError(message)) => {
            error!(%method, %path, error = %message, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(internal_error_body(message, state.is_development())),
            )
                .into_response()
        }
        None => response,
    }
}

/// Builds the 500 response for a panicking handler.
pub fn panic_response(err: Box<dyn Any + Send + 'static>, development: bool) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    error!(error = %message, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(internal_error_body(&message, development)),
    )
        .into_response()
}

/// Browser-hardening headers added to every response that does not set them itself.
pub fn security_headers() -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self';base-uri 'self';frame-ancestors 'self';object-src 'none'"),
        ),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("origin-agent-cluster"),
            HeaderValue::from_static("?1"),
        ),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ),
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (
            HeaderName::from_static("x-download-options"),
            HeaderValue::from_static("noopen"),
        ),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ),
        (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
    ]
}

/// CORS for a single browser origin, with credentials.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(HeaderValue::from_str(origin)?)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        let value = HeaderValue::from_static("Bearer abc.def.ghi");
        assert_eq!(bearer_token(Some(&value)), Some("abc.def.ghi"));

        let value = HeaderValue::from_static("bearer   abc");
        assert_eq!(bearer_token(Some(&value)), Some("abc"));

        let value = HeaderValue::from_static("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(Some(&value)), None);

        let value = HeaderValue::from_static("Bearer ");
        assert_eq!(bearer_token(Some(&value)), None);

        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_cors_layer_rejects_invalid_origin() {
        assert!(cors_layer("http://localhost:5173").is_ok());
        assert!(cors_layer("http://bad\norigin").is_err());
    }
}
