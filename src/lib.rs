pub mod auth;
pub mod config;
pub mod core;
pub mod credential;
pub mod diagnostics;
pub mod firestore;
pub mod registry;
pub mod server;
pub mod store;
pub mod telemetry;

use auth::IdTokenVerifier;
use core::middleware::AuthMiddleware;
use credential::ServiceCredential;
use firestore::{FirebaseFirestore, FirestoreError};
use std::sync::{Arc, OnceLock};
use store::{DocumentStore, StoredDocument};
use url::Url;

/// Options applied when a [`FirebaseApp`] is constructed.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Realtime Database endpoint (`FIREBASE_DB_URL`).
    pub database_url: Option<Url>,
}

/// An authenticated Firebase Admin client for one project.
pub struct FirebaseApp {
    credential: ServiceCredential,
    options: AppOptions,
    middleware: AuthMiddleware,
    firestore: OnceLock<Arc<FirebaseFirestore>>,
}

impl FirebaseApp {
    pub fn new(credential: ServiceCredential, options: AppOptions) -> Self {
        let middleware = AuthMiddleware::new(credential.key().clone());
        Self {
            credential,
            options,
            middleware,
            firestore: OnceLock::new(),
        }
    }

    pub fn project_id(&self) -> &str {
        self.credential.project_id()
    }

    pub fn client_email(&self) -> &str {
        self.credential.client_email()
    }

    pub fn database_url(&self) -> Option<&Url> {
        self.options.database_url.as_ref()
    }

    /// The Firestore client for this project, created on first use.
    pub fn firestore(&self) -> Arc<FirebaseFirestore> {
        self.firestore
            .get_or_init(|| {
                Arc::new(FirebaseFirestore::new(
                    self.middleware.clone(),
                    self.project_id(),
                ))
            })
            .clone()
    }

    /// A verifier for ID tokens minted for this project.
    pub fn id_token_verifier(&self) -> IdTokenVerifier {
        IdTokenVerifier::new(self.project_id().to_string())
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirebaseApp {
    async fn query(
        &self,
        collection: &str,
        limit: i32,
    ) -> Result<Vec<StoredDocument>, FirestoreError> {
        DocumentStore::query(self.firestore().as_ref(), collection, limit).await
    }

    async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, FirestoreError> {
        DocumentStore::get(self.firestore().as_ref(), collection, id).await
    }
}
