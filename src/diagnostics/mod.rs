//! Firebase connection check.
//!
//! Runs three checks in order and prints a human-readable report:
//!
//! 1. required environment variables are set,
//! 2. the service-account key loads and the Firebase client initializes,
//! 3. Firestore answers a one-document read.
//!
//! A credential or initialization failure skips step 3. The report always ends
//! with a single pass/fail banner.
//!
//! ```text
//! START → ENV_CHECKED → CRED_LOADING → {CRED_FAILED | INIT_FAILED | CLIENT_READY}
//!       → PROBE_PENDING → {PROBE_SUCCESS | PROBE_FAILED}
//! ```

pub mod env;
pub mod probe;


use self::env::{inspect, EnvCheck, EnvironmentConfig, REQUIRED_KEYS};
use self::probe::{probe, ErrorKind, ProbeResult, DEFAULT_PROBE_COLLECTION, DEFAULT_PROBE_TIMEOUT};
use crate::credential::{CredentialLoadError, ServiceCredential, DEFAULT_CREDENTIAL_PATH};
use crate::registry::{AppRegistry, InitError};
use crate::store::DocumentStore;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const RULE: &str = "================================";
const DATABASE_URL_KEY: &str = "FIREBASE_DB_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    EnvChecked,
    CredLoading,
    CredFailed,
    InitFailed,
    ClientReady,
    ProbePending,
    ProbeSuccess,
    ProbeFailed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Stage::CredFailed | Stage::InitFailed | Stage::ProbeSuccess | Stage::ProbeFailed
        )
    }
}

/// A single failed check.
#[derive(Error, Debug)]
pub enum CheckFailure {
    #[error("{key} is not set")]
    MissingEnvironment { key: String },
    #[error(transparent)]
    Credential(#[from] CredentialLoadError),
    #[error(transparent)]
    Init(#[from] InitError),
    #[error("Firestore connection failed ({kind}): {message}")]
    Connectivity { kind: ErrorKind, message: String },
}

#[derive(Debug, Clone)]
pub struct DiagnosticSettings {
    pub credential_path: PathBuf,
    pub required_keys: Vec<String>,
    pub probe_collection: String,
    pub probe_timeout: Duration,
}

impl Default for DiagnosticSettings {
    fn default() -> Self {
        Self {
            credential_path: PathBuf::from(DEFAULT_CREDENTIAL_PATH),
            required_keys: REQUIRED_KEYS.iter().map(|k| k.to_string()).collect(),
            probe_collection: DEFAULT_PROBE_COLLECTION.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Outcome of a diagnostic run.
#[derive(Debug)]
pub struct DiagnosticReport {
    /// Every stage visited, starting with `Start` and ending with a terminal stage.
    pub stages: Vec<Stage>,
    pub env: EnvCheck,
    /// `None` when the probe was skipped.
    pub probe: Option<ProbeResult>,
    pub failures: Vec<CheckFailure>,
}

impl DiagnosticReport {
    pub fn final_stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Start)
    }

    /// Overall status. Missing environment keys are reported but do not decide it.
    pub fn success(&self) -> bool {
        self.final_stage() == Stage::ProbeSuccess
    }
}

/// Sequences the checks against an explicit registry handle.
pub struct Diagnostic<'a, C> {
    env: &'a EnvironmentConfig,
    registry: &'a AppRegistry<C>,
    settings: DiagnosticSettings,
}

impl<'a, C> Diagnostic<'a, C>
where
    C: DocumentStore,
{
    pub fn new(
        env: &'a EnvironmentConfig,
        registry: &'a AppRegistry<C>,
        settings: DiagnosticSettings,
    ) -> Self {
        Self {
            env,
            registry,
            settings,
        }
    }

    /// Runs every check, writing the report to `out`.
    ///
    /// Check failures are captured in the returned report; only write errors are returned as `Err`.
    pub async fn run<W: Write>(&self, out: &mut W) -> io::Result<DiagnosticReport> {
        let mut report = DiagnosticReport {
            stages: vec![Stage::Start],
            env: EnvCheck {
                entries: Vec::new(),
            },
            probe: None,
            failures: Vec::new(),
        };

        writeln!(out, "{}", RULE)?;
        writeln!(out, "Firebase Connection Test")?;
        writeln!(out, "{}", RULE)?;

        self.check_environment(out, &mut report)?;
        if let Some(app) = self.check_client(out, &mut report).await? {
            self.check_connectivity(out, &mut report, app.as_ref()).await?;
        }

        print_status(out, report.success())?;
        Ok(report)
    }

    fn check_environment<W: Write>(
        &self,
        out: &mut W,
        report: &mut DiagnosticReport,
    ) -> io::Result<()> {
        section(out, "Test 1: Environment Variables")?;

        let required: Vec<&str> = self.settings.required_keys.iter().map(String::as_str).collect();
        let check = inspect(self.env, &required);
        for entry in &check.entries {
            writeln!(out, "{}", entry.line())?;
        }
        for key in check.missing() {
            warn!(key, "required environment variable is not set");
            report.failures.push(CheckFailure::MissingEnvironment {
                key: key.to_string(),
            });
        }

        report.env = check;
        advance(report, Stage::EnvChecked);
        Ok(())
    }

    async fn check_client<W: Write>(
        &self,
        out: &mut W,
        report: &mut DiagnosticReport,
    ) -> io::Result<Option<std::sync::Arc<C>>> {
        section(out, "Test 2: Firebase Admin SDK")?;
        advance(report, Stage::CredLoading);

        let path = &self.settings.credential_path;
        let credential = match ServiceCredential::load(path).await {
            Ok(credential) => credential,
            Err(err) => {
                match &err {
                    CredentialLoadError::Read { .. } => {
                        writeln!(out, "✗ {} NOT found", path.display())?
                    }
                    _ => writeln!(out, "✗ {} could not be loaded", path.display())?,
                }
                writeln!(out, "  - Error: {}", err)?;
                print_remediation(out, path)?;
                warn!(error = %err, "credential load failed");
                report.failures.push(err.into());
                advance(report, Stage::CredFailed);
                return Ok(None);
            }
        };

        writeln!(out, "✓ {} loaded", path.display())?;
        writeln!(out, "  - Project ID: {}", credential.project_id())?;
        writeln!(out, "  - Client Email: {}", credential.client_email())?;

        let fresh = !self.registry.is_initialized();
        match self
            .registry
            .initialize(&credential, self.env.get(DATABASE_URL_KEY))
            .await
        {
            Ok(app) => {
                if fresh {
                    writeln!(out, "✓ Firebase Admin SDK initialized")?;
                } else {
                    writeln!(out, "✓ Firebase Admin SDK already initialized")?;
                }
                advance(report, Stage::ClientReady);
                Ok(Some(app))
            }
            Err(err) => {
                writeln!(out, "✗ Firebase Admin SDK initialization failed")?;
                writeln!(out, "  - Error: {}", err)?;
                warn!(error = %err, "client initialization failed");
                report.failures.push(err.into());
                advance(report, Stage::InitFailed);
                Ok(None)
            }
        }
    }

    async fn check_connectivity<W: Write>(
        &self,
        out: &mut W,
        report: &mut DiagnosticReport,
        store: &C,
    ) -> io::Result<()> {
        section(out, "Test 3: Firestore Connection")?;
        advance(report, Stage::ProbePending);

        let collection = &self.settings.probe_collection;
        let result = probe(store, collection, self.settings.probe_timeout).await;
        match &result {
            ProbeResult::Success { count } => {
                writeln!(out, "✓ Firestore connection successful")?;
                writeln!(out, "  - Documents read from '{}': {}", collection, count)?;
                advance(report, Stage::ProbeSuccess);
            }
            ProbeResult::Failure { kind, message } => {
                writeln!(out, "✗ Firestore connection failed")?;
                writeln!(out, "  - Error: {}", message)?;
                writeln!(out, "  - Cause: {}", kind.cause())?;
                warn!(%kind, error = %message, "connectivity probe failed");
                report.failures.push(CheckFailure::Connectivity {
                    kind: *kind,
                    message: message.clone(),
                });
                advance(report, Stage::ProbeFailed);
            }
        }

        report.probe = Some(result);
        Ok(())
    }
}

fn advance(report: &mut DiagnosticReport, stage: Stage) {
    debug!(from = ?report.final_stage(), to = ?stage, "diagnostic stage");
    report.stages.push(stage);
}

fn section<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "-".repeat(title.len()))
}

fn print_remediation<W: Write>(out: &mut W, path: &std::path::Path) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "To fix:")?;
    writeln!(out, "1. Go to https://console.firebase.google.com/")?;
    writeln!(out, "2. Select your project")?;
    writeln!(out, "3. Go to Settings → Service Accounts")?;
    writeln!(out, "4. Click \"Generate New Private Key\"")?;
    writeln!(out, "5. Save the JSON file as: {}", path.display())
}

fn print_status<W: Write>(out: &mut W, success: bool) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    if success {
        writeln!(out, "✓ All tests passed!")?;
        writeln!(out, "Your Firebase setup is correct.")?;
    } else {
        writeln!(out, "✗ Some tests failed!")?;
        writeln!(out, "Please check the errors above.")?;
    }
    writeln!(out, "{}", RULE)
}
