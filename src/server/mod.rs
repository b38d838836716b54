//! The HTTP service.
//!
//! At boot the service loads the service-account key and initializes Firebase
//! (unless it runs in development mode). A failed initialization is logged and the
//! service keeps running in degraded mode, where protected routes answer 503.

pub mod error;
pub mod middleware;
pub mod routes;

#[cfg(test)]
mod tests;

use self::middleware::{
    cors_layer, panic_response, render_internal_errors, require_auth, security_headers,
};
use crate::auth::TokenVerifier;
use crate::config::{ServerConfig, DEVELOPMENT};
use crate::credential::ServiceCredential;
use crate::diagnostics::probe::{DEFAULT_PROBE_COLLECTION, DEFAULT_PROBE_TIMEOUT};
use crate::registry::AppRegistry;
use crate::store::DocumentStore;
use axum::extract::DefaultBodyLimit;
use axum::http::header::InvalidHeaderValue;
use axum::routing::get;
use axum::{middleware as axum_middleware, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

/// Largest accepted request body.
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Firebase initialized; protected routes require an ID token.
    Authenticated,
    /// Firebase deliberately disabled; protected routes accept anonymous callers.
    Development,
    /// Firebase was requested but failed to initialize.
    Degraded,
}

#[derive(Clone)]
pub struct AppState {
    pub mode: AuthMode,
    pub node_env: String,
    pub store: Option<Arc<dyn DocumentStore>>,
    pub verifier: Option<Arc<dyn TokenVerifier>>,
    pub probe_collection: String,
    pub probe_timeout: Duration,
}

impl AppState {
    pub fn new(mode: AuthMode, node_env: impl Into<String>) -> Self {
        Self {
            mode,
            node_env: node_env.into(),
            store: None,
            verifier: None,
            probe_collection: DEFAULT_PROBE_COLLECTION.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn is_development(&self) -> bool {
        self.node_env == DEVELOPMENT
    }
}

/// Decides the auth mode and builds the state, initializing Firebase through `registry`.
pub async fn bootstrap(config: &ServerConfig, registry: &AppRegistry) -> AppState {
    let base = |mode| {
        let mut state = AppState::new(mode, config.node_env.clone());
        state.probe_collection = config.firebase.probe_collection.clone();
        state.probe_timeout = config.firebase.probe_timeout();
        state
    };

    if !config.firebase_requested() {
        info!("Running in development mode without Firebase authentication");
        return base(AuthMode::Development);
    }

    let credential = match ServiceCredential::load(&config.firebase.credential_path).await {
        Ok(credential) => credential,
        Err(err) => {
            warn!(error = %err, "Firebase service account not configured. Running without Firebase.");
            warn!(
                "To enable Firebase, update {} with your credentials.",
                config.firebase.credential_path.display()
            );
            return base(AuthMode::Degraded);
        }
    };

    match registry
        .initialize(&credential, config.database_url.as_deref())
        .await
    {
        Ok(app) => {
            info!(project_id = app.project_id(), "Firebase Admin SDK initialized successfully");
            let verifier: Arc<dyn TokenVerifier> = Arc::new(app.id_token_verifier());
            base(AuthMode::Authenticated)
                .with_store(app)
                .with_verifier(verifier)
        }
        Err(err) => {
            warn!(error = %err, "Firebase initialization failed. Running without Firebase.");
            base(AuthMode::Degraded)
        }
    }
}

/// Builds the full application router.
pub fn router(state: AppState, cors_origin: &str) -> Result<Router, InvalidHeaderValue> {
    let cors = cors_layer(cors_origin)?;
    let development = state.is_development();

    let mut protected = Router::new().nest("/auth", routes::auth_routes());
    for &collection in routes::COLLECTIONS {
        protected = protected.nest(&format!("/{}", collection), routes::collection_routes(collection));
    }
    let protected =
        protected.route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .nest("/health", routes::health_routes())
        .merge(protected);

    let mut app = Router::new()
        .route("/health", get(routes::liveness))
        .nest("/api", api)
        .fallback(routes::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            render_internal_errors,
        ))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(cors)
        .layer(CompressionLayer::new());

    for (name, value) in security_headers() {
        app = app.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }

    let app = app
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CatchPanicLayer::custom(move |err| {
            panic_response(err, development)
        }))
        .with_state(state);

    Ok(app)
}

/// Boots Firebase, binds the port and serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let registry = AppRegistry::new();
    let state = bootstrap(&config, &registry).await;
    let app = router(state, &config.cors_origin)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on port {}", config.port);
    info!("Environment: {}", config.node_env);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
