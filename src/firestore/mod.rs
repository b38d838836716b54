//! Cloud Firestore module.
//!
//! A read-only REST client for Cloud Firestore: collection reads bounded by a
//! limit and single-document reads by id.

pub mod models;
pub mod query;
pub mod reference;


use self::reference::CollectionReference;
use crate::core::middleware::AuthMiddleware;
use crate::core::{authorized_client, ApiFailure};
use crate::store::{is_valid_document_id, DocumentStore, StoredDocument};
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;

const FIRESTORE_V1_API: &str =
    "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents";

/// Errors that can occur during Firestore operations.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// Wrapper for `reqwest::Error`.
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Wrapper for `reqwest_middleware::Error`.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    /// Errors returned by the Firestore API.
    #[error("API error: {0}")]
    Api(ApiFailure),
    /// Wrapper for `serde_json::Error`.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    /// A document path that cannot be addressed as `<collection>/<id>`.
    #[error("Invalid document path: {0}")]
    InvalidPath(String),
}

impl FirestoreError {
    /// The canonical Google status string (e.g. `PERMISSION_DENIED`), if the API returned one.
    pub fn status(&self) -> Option<&str> {
        match self {
            FirestoreError::Api(failure) => failure.status.as_deref(),
            _ => None,
        }
    }
}

/// Client for interacting with Cloud Firestore.
pub struct FirebaseFirestore {
    client: ClientWithMiddleware,
    documents_url: String,
}

impl FirebaseFirestore {
    /// Creates a client for the default database of `project_id`.
    ///
    /// This is typically called via `FirebaseApp::firestore()`.
    pub fn new(middleware: AuthMiddleware, project_id: &str) -> Self {
        Self {
            client: authorized_client(middleware),
            documents_url: FIRESTORE_V1_API.replace("{project_id}", project_id),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_with_client(client: ClientWithMiddleware, documents_url: String) -> Self {
        Self {
            client,
            documents_url,
        }
    }

    /// Gets a `CollectionReference` for the collection with the given ID (e.g., "users").
    pub fn collection(&self, collection_id: &str) -> CollectionReference<'_> {
        CollectionReference {
            client: &self.client,
            documents_url: &self.documents_url,
            collection_id: collection_id.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirebaseFirestore {
    async fn query(
        &self,
        collection: &str,
        limit: i32,
    ) -> Result<Vec<StoredDocument>, FirestoreError> {
        self.collection(collection).limit(limit).get().await
    }

    async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, FirestoreError> {
        // An id that is not a single path segment names no document here.
        if !is_valid_document_id(id) {
            return Ok(None);
        }
        self.collection(collection).doc(id).get().await
    }
}
