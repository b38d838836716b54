//! Campus gateway
//!
//! REST API for the school-management backend.

use anyhow::Result;
use campus_gateway::config::ServerConfig;
use campus_gateway::server;
use campus_gateway::telemetry::init_tracing;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    init_tracing("info", !config.is_development());

    server::serve(config).await
}
