//! One-time construction of the process's Firebase client.
//!
//! The registry is an explicit handle created at bootstrap and passed to whoever
//! needs the client. The first successful [`AppRegistry::initialize`] call builds
//! the client; later calls return the same instance without constructing again.

use crate::credential::ServiceCredential;
use crate::{AppOptions, FirebaseApp};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

#[derive(Error, Debug)]
pub enum InitError {
    #[error("Invalid database URL '{url}': {source}")]
    InvalidDatabaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Client construction failed: {0}")]
    Construction(String),
}

type Factory<C> = dyn Fn(ServiceCredential, AppOptions) -> Result<C, InitError> + Send + Sync;

/// Holds at most one client of type `C`.
pub struct AppRegistry<C = FirebaseApp> {
    factory: Box<Factory<C>>,
    app: OnceCell<Arc<C>>,
}

impl AppRegistry<FirebaseApp> {
    pub fn new() -> Self {
        Self::with_factory(|credential, options| Ok(FirebaseApp::new(credential, options)))
    }
}

impl Default for AppRegistry<FirebaseApp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> AppRegistry<C> {
    /// Creates a registry that builds its client with `factory`.
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(ServiceCredential, AppOptions) -> Result<C, InitError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            app: OnceCell::new(),
        }
    }

    /// Returns the client, constructing it from `credential` if none exists yet.
    ///
    /// Concurrent first callers are serialized; exactly one of them runs the factory.
    pub async fn initialize(
        &self,
        credential: &ServiceCredential,
        database_url: Option<&str>,
    ) -> Result<Arc<C>, InitError> {
        if let Some(app) = self.app.get() {
            debug!(project_id = credential.project_id(), "client already initialized");
            return Ok(Arc::clone(app));
        }

        let options = AppOptions {
            database_url: parse_database_url(database_url)?,
        };

        let app = self
            .app
            .get_or_try_init(|| async {
                info!(project_id = credential.project_id(), "initializing Firebase client");
                (self.factory)(credential.clone(), options).map(Arc::new)
            })
            .await?;

        Ok(Arc::clone(app))
    }

    pub fn get(&self) -> Option<Arc<C>> {
        self.app.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.app.initialized()
    }
}

fn parse_database_url(raw: Option<&str>) -> Result<Option<Url>, InitError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(url) => Url::parse(url)
            .map(Some)
            .map_err(|source| InitError::InvalidDatabaseUrl {
                url: url.to_string(),
                source,
            }),
        None => Ok(None),
    }
}
