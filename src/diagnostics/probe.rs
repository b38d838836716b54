//! The connectivity probe: one bounded read, classified.

use crate::firestore::FirestoreError;
use crate::store::DocumentStore;
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PROBE_COLLECTION: &str = "users";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a probe failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    Unauthenticated,
    Timeout,
    Unknown,
}

impl ErrorKind {
    /// Remediation hint shown to the operator.
    pub fn cause(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "Check your Firestore Security Rules",
            ErrorKind::Unauthenticated => "Check your service account credentials",
            ErrorKind::Timeout => "No response from Firestore; check network access",
            ErrorKind::Unknown => "Unknown; see the error above",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Markers recognized in store errors, in priority order.
///
/// Each marker is first compared with the structured status the API returned and
/// then searched for in the error message. `invalid_grant` is what the OAuth token
/// endpoint answers when the service-account key was revoked or is not valid.
pub const ERROR_MARKERS: &[(&str, ErrorKind)] = &[
    ("PERMISSION_DENIED", ErrorKind::PermissionDenied),
    ("UNAUTHENTICATED", ErrorKind::Unauthenticated),
    ("invalid_grant", ErrorKind::Unauthenticated),
];

/// Classifies a bare error message by substring. Unmatched messages are `Unknown`.
pub fn classify_message(message: &str) -> ErrorKind {
    ERROR_MARKERS
        .iter()
        .find(|(marker, _)| message.contains(marker))
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

pub fn classify(err: &FirestoreError) -> ErrorKind {
    if let Some(status) = err.status() {
        if let Some((_, kind)) = ERROR_MARKERS.iter().find(|(marker, _)| *marker == status) {
            return *kind;
        }
    }
    classify_message(&error_message(err))
}

fn error_message(err: &FirestoreError) -> String {
    match err {
        FirestoreError::Api(failure) => failure.message.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Success { count: usize },
    Failure { kind: ErrorKind, message: String },
}

impl ProbeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success { .. })
    }
}

/// Reads at most one document from `collection`, giving up after `deadline`.
pub async fn probe<S>(store: &S, collection: &str, deadline: Duration) -> ProbeResult
where
    S: DocumentStore + ?Sized,
{
    debug!(collection, ?deadline, "probing document store");
    match tokio::time::timeout(deadline, store.query(collection, 1)).await {
        Ok(Ok(documents)) => ProbeResult::Success {
            count: documents.len(),
        },
        Ok(Err(err)) => ProbeResult::Failure {
            kind: classify(&err),
            message: error_message(&err),
        },
        Err(_) => ProbeResult::Failure {
            kind: ErrorKind::Timeout,
            message: format!("No response within {}s", deadline.as_secs_f32()),
        },
    }
}
