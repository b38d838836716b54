pub mod middleware;

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;

use self::middleware::AuthMiddleware;

#[derive(Debug, Deserialize)]
pub struct GoogleErrorResponse {
    pub error: GoogleErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct GoogleErrorDetails {
    pub code: u16,
    pub message: String,
    pub status: Option<String>,
}

/// A non-success response from a Google REST API, reduced to the parts callers branch on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// HTTP status code of the response.
    pub http_status: u16,
    /// Canonical status string such as `PERMISSION_DENIED`, when the body carried one.
    pub status: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.status {
            Some(status) => write!(f, "{} {}: {}", self.http_status, status, self.message),
            None => write!(f, "{}: {}", self.http_status, self.message),
        }
    }
}

/// Reads the body of a failed response and extracts the Google error envelope.
///
/// Bodies that are not a Google error envelope are kept verbatim as the message,
/// prefixed with `default_msg`.
pub async fn parse_error_response(response: reqwest::Response, default_msg: &str) -> ApiFailure {
    let http_status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    parse_error_body(http_status, &text, default_msg)
}

pub(crate) fn parse_error_body(http_status: u16, body: &str, default_msg: &str) -> ApiFailure {
    // runQuery wraps errors in a single-element array.
    let parsed = serde_json::from_str::<GoogleErrorResponse>(body).ok().or_else(|| {
        serde_json::from_str::<Vec<GoogleErrorResponse>>(body)
            .ok()
            .and_then(|mut errors| errors.pop())
    });

    match parsed {
        Some(resp) => ApiFailure {
            http_status,
            status: resp.error.status,
            message: resp.error.message,
        },
        None => ApiFailure {
            http_status,
            status: None,
            message: format!("{}: {}", default_msg, body.trim()),
        },
    }
}

/// Builds the HTTP client shared by all Firebase services: transient-retry first, then auth.
pub(crate) fn authorized_client(middleware: AuthMiddleware) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

    ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .with(middleware)
        .build()
}
