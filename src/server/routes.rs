use super::error::ApiError;
use super::middleware::Caller;
use super::AppState;
use crate::diagnostics::probe::{probe, ProbeResult};
use crate::store::{is_valid_document_id, DocumentStore, StoredDocument};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: i32 = 50;
pub const MAX_PAGE_SIZE: i32 = 100;

/// Collections exposed read-only under `/api/<name>`.
pub const COLLECTIONS: &[&str] = &["users", "classes", "grades", "attendance", "payments"];

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn store(state: &AppState) -> Result<&Arc<dyn DocumentStore>, ApiError> {
    state.store.as_ref().ok_or(ApiError::FirebaseUnavailable)
}

pub async fn liveness() -> Json<serde_json::Value> {
    Json(json!({ "status": "Server is running", "timestamp": timestamp() }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(service_health))
        .route("/firestore", get(firestore_health))
}

async fn service_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.node_env,
        "firebase": state.mode,
        "timestamp": timestamp(),
    }))
}

/// Runs the connectivity probe against the configured store.
async fn firestore_health(State(state): State<AppState>) -> Response {
    let Some(store) = state.store.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "firebase": state.mode })),
        )
            .into_response();
    };

    match probe(store.as_ref(), &state.probe_collection, state.probe_timeout).await {
        ProbeResult::Success { count } => Json(json!({
            "status": "ok",
            "collection": state.probe_collection,
            "documents": count,
        }))
        .into_response(),
        ProbeResult::Failure { kind, message } => {
            let mut body = json!({
                "status": "error",
                "kind": kind.to_string(),
                "cause": kind.cause(),
            });
            if state.is_development() {
                body["message"] = json!(message);
            }
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/me", get(current_caller))
}

async fn current_caller(Extension(caller): Extension<Caller>) -> Json<serde_json::Value> {
    match caller {
        Caller::Anonymous => Json(json!({ "anonymous": true })),
        Caller::User(claims) => Json(json!({
            "anonymous": false,
            "uid": claims.sub,
            "email": claims.email,
        })),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i32>,
}

impl ListParams {
    fn page_size(&self) -> i32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// `GET /` lists documents and `GET /{id}` reads one, both from `collection`.
pub fn collection_routes(collection: &'static str) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |state: State<AppState>, params: Query<ListParams>| {
                list_documents(state, params, collection)
            }),
        )
        .route(
            "/{id}",
            get(move |state: State<AppState>, id: Path<String>| {
                get_document(state, id, collection)
            }),
        )
}

async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    collection: &'static str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let documents = store(&state)?
        .query(collection, params.page_size())
        .await?;
    Ok(Json(json!({ "count": documents.len(), "data": documents })))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    collection: &'static str,
) -> Result<Json<StoredDocument>, ApiError> {
    // The decoded id may carry `/` or dot segments; those never name a document here.
    if !is_valid_document_id(&id) {
        return Err(ApiError::NotFound("Document"));
    }
    store(&state)?
        .get(collection, &id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Document"))
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
        .into_response()
}
