use super::*;
use crate::auth::{FirebaseTokenClaims, TokenVerificationError};
use crate::core::ApiFailure;
use crate::firestore::FirestoreError;
use crate::store::StoredDocument;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use clap::Parser;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;
use tower::ServiceExt;

const ORIGIN: &str = "http://localhost:5173";
const GOOD_TOKEN: &str = "good-token";

struct FakeStore {
    fail_with: Option<&'static str>,
    last_limit: Arc<AtomicI32>,
    fetched_ids: Arc<Mutex<Vec<String>>>,
}

impl FakeStore {
    fn with_documents() -> Self {
        Self {
            fail_with: None,
            last_limit: Arc::new(AtomicI32::new(0)),
            fetched_ids: Arc::default(),
        }
    }

    fn failing(message: &'static str) -> Self {
        Self {
            fail_with: Some(message),
            last_limit: Arc::new(AtomicI32::new(0)),
            fetched_ids: Arc::default(),
        }
    }

    fn error(&self, message: &str) -> FirestoreError {
        FirestoreError::Api(ApiFailure {
            http_status: 403,
            status: Some("PERMISSION_DENIED".to_string()),
            message: message.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl DocumentStore for FakeStore {
    async fn query(
        &self,
        collection: &str,
        limit: i32,
    ) -> Result<Vec<StoredDocument>, FirestoreError> {
        self.last_limit.store(limit, Ordering::SeqCst);
        if let Some(message) = self.fail_with {
            return Err(self.error(message));
        }
        Ok(vec![
            StoredDocument {
                id: "a".to_string(),
                data: json!({ "collection": collection }),
            },
            StoredDocument {
                id: "b".to_string(),
                data: json!({ "collection": collection }),
            },
        ])
    }

    async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, FirestoreError> {
        self.fetched_ids.lock().unwrap().push(id.to_string());
        if let Some(message) = self.fail_with {
            return Err(self.error(message));
        }
        Ok((id == "a").then(|| StoredDocument {
            id: id.to_string(),
            data: json!({ "collection": collection }),
        }))
    }
}

struct FakeVerifier;

#[async_trait::async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<FirebaseTokenClaims, TokenVerificationError> {
        if token != GOOD_TOKEN {
            return Err(TokenVerificationError::InvalidToken("bad signature".to_string()));
        }
        Ok(FirebaseTokenClaims {
            aud: "test-project".to_string(),
            iss: "https://securetoken.google.com/test-project".to_string(),
            sub: "uid-123".to_string(),
            exp: 0,
            iat: 0,
            auth_time: 0,
            email: Some("staff@school.test".to_string()),
            claims: Default::default(),
        })
    }
}

fn authenticated(store: FakeStore, node_env: &str) -> AppState {
    AppState::new(AuthMode::Authenticated, node_env)
        .with_store(Arc::new(store))
        .with_verifier(Arc::new(FakeVerifier))
}

fn app(state: AppState) -> Router {
    router(state, ORIGIN).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_liveness_reports_running() {
    let (status, headers, body) = send(
        app(AppState::new(AuthMode::Development, "development")),
        get("/health"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Server is running");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
}

#[tokio::test]
async fn test_service_health_reports_mode() {
    let (status, _, body) = send(
        app(AppState::new(AuthMode::Degraded, "production")),
        get("/api/health"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "production");
    assert_eq!(body["firebase"], "degraded");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, _, body) = send(
        app(AppState::new(AuthMode::Development, "development")),
        get("/api/nothing-here"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Route not found");
}

#[tokio::test]
async fn test_degraded_mode_refuses_protected_routes() {
    let (status, _, body) = send(
        app(AppState::new(AuthMode::Degraded, "production")),
        get_with_token("/api/users", GOOD_TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service unavailable");
}

#[tokio::test]
async fn test_development_mode_lets_anonymous_callers_through() {
    let state = AppState::new(AuthMode::Development, "development")
        .with_store(Arc::new(FakeStore::with_documents()));

    let (status, _, body) = send(app(state.clone()), get("/api/auth/me")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["anonymous"], true);

    let (status, _, body) = send(app(state), get("/api/classes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_missing_or_invalid_token_is_401() {
    let state = authenticated(FakeStore::with_documents(), "production");

    let (status, _, body) = send(app(state.clone()), get("/api/grades")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing bearer token");

    let (status, _, body) = send(app(state), get_with_token("/api/grades", "forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_verified_caller_lists_documents() {
    let store = FakeStore::with_documents();
    let last_limit = store.last_limit.clone();
    let state = authenticated(store, "production");

    let (status, _, body) = send(
        app(state.clone()),
        get_with_token("/api/attendance", GOOD_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["id"], "a");
    assert_eq!(body["data"][0]["data"]["collection"], "attendance");
    assert_eq!(last_limit.load(Ordering::SeqCst), routes::DEFAULT_PAGE_SIZE);

    let (status, _, _) = send(
        app(state),
        get_with_token("/api/attendance?limit=5000", GOOD_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last_limit.load(Ordering::SeqCst), routes::MAX_PAGE_SIZE);
}

#[tokio::test]
async fn test_me_returns_verified_identity() {
    let state = authenticated(FakeStore::with_documents(), "production");

    let (status, _, body) = send(app(state), get_with_token("/api/auth/me", GOOD_TOKEN)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["anonymous"], false);
    assert_eq!(body["uid"], "uid-123");
    assert_eq!(body["email"], "staff@school.test");
}

#[tokio::test]
async fn test_get_document_by_id() {
    let state = authenticated(FakeStore::with_documents(), "production");

    let (status, _, body) = send(
        app(state.clone()),
        get_with_token("/api/payments/a", GOOD_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "a");

    let (status, _, body) = send(app(state), get_with_token("/api/payments/zzz", GOOD_TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Document not found");
}

#[tokio::test]
async fn test_store_failure_hides_message_outside_development() {
    let state = authenticated(FakeStore::failing("rules rejected the read"), "production");

    let (status, _, body) = send(app(state), get_with_token("/api/users", GOOD_TOKEN)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["message"], "An error occurred");
}

#[tokio::test]
async fn test_store_failure_shows_message_in_development() {
    let state = authenticated(FakeStore::failing("rules rejected the read"), "development");

    let (status, _, body) = send(app(state), get_with_token("/api/users", GOOD_TOKEN)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("rules rejected the read"));
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/users")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())
        .unwrap();

    let (status, headers, _) = send(
        app(AppState::new(AuthMode::Degraded, "production")),
        req,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_firestore_health_runs_probe() {
    let state = authenticated(FakeStore::with_documents(), "production");
    let (status, _, body) = send(app(state), get("/api/health/firestore")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collection"], "users");
    assert_eq!(body["documents"], 2);

    let state = authenticated(FakeStore::failing("Missing or insufficient permissions."), "production");
    let (status, _, body) = send(app(state), get("/api/health/firestore")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["cause"], "Check your Firestore Security Rules");
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_firestore_health_unavailable_when_degraded() {
    let (status, _, body) = send(
        app(AppState::new(AuthMode::Degraded, "production")),
        get("/api/health/firestore"),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");
    assert_eq!(body["firebase"], "degraded");
}

#[tokio::test]
async fn test_document_id_cannot_escape_collection() {
    let store = FakeStore::with_documents();
    let fetched_ids = store.fetched_ids.clone();
    let state = authenticated(store, "production");

    for uri in [
        "/api/users/..%2Fadmins%2Froot",
        "/api/users/a%2Fb",
        "/api/users/..",
        "/api/users/%2E%2E",
        "/api/users/__name__",
    ] {
        let (status, _, body) = send(app(state.clone()), get_with_token(uri, GOOD_TOKEN)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["error"], "Document not found", "{uri}");
    }
    assert!(fetched_ids.lock().unwrap().is_empty());

    let (status, _, _) = send(app(state), get_with_token("/api/users/a", GOOD_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(*fetched_ids.lock().unwrap(), vec!["a".to_string()]);
}

#[tokio::test]
async fn test_bootstrap_without_credentials_degrades() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::try_parse_from([
        "campus-gateway",
        "--node-env",
        "production",
        "--credentials",
        dir.path().join("missing.json").to_str().unwrap(),
    ])
    .unwrap();

    let registry = AppRegistry::new();
    let state = bootstrap(&config, &registry).await;

    assert_eq!(state.mode, AuthMode::Degraded);
    assert!(state.store.is_none());
    assert!(!registry.is_initialized());
}

#[tokio::test]
async fn test_bootstrap_in_development_skips_firebase() {
    let config = ServerConfig::try_parse_from(["campus-gateway", "--node-env", "development"]).unwrap();

    let registry = AppRegistry::new();
    let state = bootstrap(&config, &registry).await;

    assert_eq!(state.mode, AuthMode::Development);
    assert!(state.verifier.is_none());
    assert!(!registry.is_initialized());
}
