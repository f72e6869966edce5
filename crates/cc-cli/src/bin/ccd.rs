// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The CC server daemon: boots one `cc-server` for a configured namespace
//! and blocks until asked to shut down.

use std::path::PathBuf;
use std::time::Duration;

use cc_config::{load, ConfigLayer};
use cc_logging::CliLoggingArgs;
use cc_server::{CcServer, CcServerConfig};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file, layered under environment and flags below.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    namespace: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    #[arg(long)]
    response_root: Option<PathBuf>,

    #[arg(long)]
    file_base: Option<PathBuf>,

    #[command(flatten)]
    logging: CliLoggingArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    args.logging.init("ccd")?;

    let cli_layer = ConfigLayer {
        namespace: args.namespace,
        port: args.port,
        response_root: args.response_root,
        file_base: args.file_base,
        ..Default::default()
    };
    let config = load(args.config.as_deref(), cli_layer)?;

    tracing::info!(namespace = %config.namespace, port = config.port, "starting cc server");

    let server = CcServer::new(CcServerConfig {
        namespace: cc_domain::NamespaceId::new(config.namespace)?,
        response_root: config.response_root,
        file_base: config.file_base,
        heartbeat_deadline: Duration::from_secs(config.heartbeat_deadline_secs),
        handshake_timeout: Duration::from_secs(config.handshake_timeout_secs),
        grace_period: Duration::from_secs(config.grace_period_secs),
    })?;

    server.listen(config.port).await?;
    tracing::info!("cc server ready, awaiting shutdown signal");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, tearing down");
    server.destroy();

    Ok(())
}
