//! Command-line and environment configuration for both binaries.

use crate::credential::DEFAULT_CREDENTIAL_PATH;
use crate::diagnostics::probe::DEFAULT_PROBE_COLLECTION;
use crate::diagnostics::DiagnosticSettings;
use clap::{Args, Parser};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
pub const DEVELOPMENT: &str = "development";

/// Settings shared by the service and the connection check.
#[derive(Args, Debug, Clone)]
pub struct FirebaseArgs {
    /// Path to the service-account key file
    #[arg(long = "credentials", env = "GOOGLE_SERVICE_ACCOUNT_FILE", default_value = DEFAULT_CREDENTIAL_PATH)]
    pub credential_path: PathBuf,

    /// Collection read by the connectivity probe
    #[arg(long, default_value = DEFAULT_PROBE_COLLECTION)]
    pub probe_collection: String,

    /// Seconds to wait for the connectivity probe
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub probe_timeout_secs: u64,
}

impl FirebaseArgs {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "campus-gateway")]
#[command(about = "REST API gateway for the school-management backend", long_about = None)]
#[command(version)]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Deployment mode; `development` disables Firebase unless USE_FIREBASE=true
    #[arg(long, env = "NODE_ENV", default_value = DEVELOPMENT)]
    pub node_env: String,

    /// Set to `true` to use Firebase in development mode
    #[arg(long, env = "USE_FIREBASE")]
    pub use_firebase: Option<String>,

    /// Realtime Database URL passed to the Firebase client
    #[arg(long, env = "FIREBASE_DB_URL")]
    pub database_url: Option<String>,

    /// Origin allowed by CORS
    #[arg(long, env = "CORS_ORIGIN", default_value = DEFAULT_CORS_ORIGIN)]
    pub cors_origin: String,

    #[command(flatten)]
    pub firebase: FirebaseArgs,
}

impl ServerConfig {
    pub fn is_development(&self) -> bool {
        self.node_env == DEVELOPMENT
    }

    /// Firebase is initialized outside development, or in development when explicitly enabled.
    pub fn firebase_requested(&self) -> bool {
        !self.is_development() || self.use_firebase.as_deref() == Some("true")
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "firebase-check")]
#[command(about = "Checks environment, service-account key and Firestore connectivity", long_about = None)]
#[command(version)]
pub struct CheckConfig {
    #[command(flatten)]
    pub firebase: FirebaseArgs,

    /// Emit debug logs on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl CheckConfig {
    pub fn settings(&self) -> DiagnosticSettings {
        DiagnosticSettings {
            credential_path: self.firebase.credential_path.clone(),
            probe_collection: self.firebase.probe_collection.clone(),
            probe_timeout: self.firebase.probe_timeout(),
            ..Default::default()
        }
    }
}
