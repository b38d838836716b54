//! The document-store capability the gateway and the connectivity probe depend on.

use crate::firestore::FirestoreError;
use serde::Serialize;

/// A document read from the store, with its fields flattened to JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    pub id: String,
    pub data: serde_json::Value,
}

/// Read access to a collection-of-documents service.
///
/// Implemented by [`FirebaseFirestore`](crate::firestore::FirebaseFirestore); tests provide
/// in-memory stand-ins.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns at most `limit` documents from `collection`.
    async fn query(
        &self,
        collection: &str,
        limit: i32,
    ) -> Result<Vec<StoredDocument>, FirestoreError>;

    /// Returns the document `id` in `collection`, or `None` if it does not exist.
    async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, FirestoreError>;
}

/// Whether `id` can name a document as a single path segment.
///
/// Firestore ids are at most 1500 bytes, contain no `/`, are not `.` or `..`
/// and do not match `__.*__`.
pub fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 1500
        && !id.contains('/')
        && id != "."
        && id != ".."
        && !(id.len() >= 4 && id.starts_with("__") && id.ends_with("__"))
}
