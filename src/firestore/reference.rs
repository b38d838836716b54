use super::query::LimitedQuery;
use super::models::Document;
use super::FirestoreError;
use crate::core::parse_error_response;
use crate::store::{is_valid_document_id, StoredDocument};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use url::Url;

#[derive(Clone)]
pub struct CollectionReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) documents_url: &'a str,
    pub(crate) collection_id: String,
}

impl<'a> CollectionReference<'a> {
    pub fn doc(&self, id: &str) -> DocumentReference<'a> {
        DocumentReference {
            client: self.client,
            documents_url: self.documents_url,
            collection_id: self.collection_id.clone(),
            id: id.to_string(),
        }
    }

    /// At most `limit` documents of this collection.
    pub fn limit(&self, limit: i32) -> LimitedQuery<'a> {
        LimitedQuery {
            client: self.client,
            documents_url: self.documents_url,
            collection_id: self.collection_id.clone(),
            limit,
        }
    }
}

/// A single document, addressed by collection and id.
#[derive(Clone)]
pub struct DocumentReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) documents_url: &'a str,
    pub(crate) collection_id: String,
    pub(crate) id: String,
}

impl DocumentReference<'_> {
    /// The document URL. The collection and the id are each pushed as one
    /// escaped path segment, so neither can climb out of its parent.
    pub fn url(&self) -> Result<Url, FirestoreError> {
        if !is_valid_document_id(&self.collection_id) || !is_valid_document_id(&self.id) {
            return Err(FirestoreError::InvalidPath(format!(
                "{}/{}",
                self.collection_id, self.id
            )));
        }
        let mut url = Url::parse(self.documents_url)
            .map_err(|e| FirestoreError::InvalidPath(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| FirestoreError::InvalidPath(self.documents_url.to_string()))?
            .push(&self.collection_id)
            .push(&self.id);
        Ok(url)
    }

    /// Reads the document; `None` when it does not exist.
    pub async fn get(&self) -> Result<Option<StoredDocument>, FirestoreError> {
        let response = self.client.get(self.url()?).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let document: Document = response.json().await?;
                document.into_stored().map(Some)
            }
            _ => Err(FirestoreError::Api(
                parse_error_response(response, "Get document failed").await,
            )),
        }
    }
}
