//! Checks that this machine can reach Firestore with the configured service account.
//!
//! Exits with status 1 when any check fails.

use anyhow::Result;
use campus_gateway::config::CheckConfig;
use campus_gateway::diagnostics::env::EnvironmentConfig;
use campus_gateway::diagnostics::Diagnostic;
use campus_gateway::registry::AppRegistry;
use campus_gateway::telemetry::init_tracing;
use clap::Parser;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<()> {
    let config = CheckConfig::parse();
    init_tracing(if config.verbose { "debug" } else { "warn" }, false);

    let env = EnvironmentConfig::from_process();
    let registry = AppRegistry::new();
    let diagnostic = Diagnostic::new(&env, &registry, config.settings());

    let mut stdout = std::io::stdout().lock();
    let report = diagnostic.run(&mut stdout).await?;
    stdout.flush()?;

    if !report.success() {
        std::process::exit(1);
    }
    Ok(())
}
