use super::models::{CollectionSelector, RunQueryRequest, RunQueryResponse, StructuredQuery};
use super::FirestoreError;
use crate::core::parse_error_response;
use crate::store::StoredDocument;
use reqwest_middleware::ClientWithMiddleware;

/// A read of at most `limit` documents from one collection, in the server's default order.
#[derive(Clone)]
pub struct LimitedQuery<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) documents_url: &'a str,
    pub(crate) collection_id: String,
    pub(crate) limit: i32,
}

impl LimitedQuery<'_> {
    fn request(&self) -> RunQueryRequest {
        RunQueryRequest {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: self.collection_id.clone(),
                }],
                limit: self.limit,
            },
        }
    }

    /// Runs the query through `documents:runQuery`.
    pub async fn get(&self) -> Result<Vec<StoredDocument>, FirestoreError> {
        let response = self
            .client
            .post(format!("{}:runQuery", self.documents_url))
            .json(&self.request())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FirestoreError::Api(
                parse_error_response(response, "Run query failed").await,
            ));
        }

        let stream: Vec<RunQueryResponse> = response.json().await?;
        stream
            .into_iter()
            .filter_map(|element| element.document)
            .map(|document| document.into_stored())
            .collect()
    }
}
