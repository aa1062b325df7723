//! Keeper round simulator for a Feeflow deployment

use anyhow::{Context, Result};
use clap::Parser;
use feeflow_config::DeploymentConfig;
use feeflow_distribution::Deployment;
use feeflow_types::Bytes;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Deployment configuration file
    #[arg(short, long, default_value = "config/deployment.toml")]
    config: PathBuf,

    /// Environment overlay from `environments/<name>.toml`
    #[arg(short, long)]
    environment: Option<String>,

    /// Hex payload handed to every fee collector sweep
    #[arg(long, default_value = "")]
    collector_payload: String,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    info!("🚀 Starting Feeflow keeper simulation");
    info!("📂 Loading deployment from {:?}", args.config);

    let config = DeploymentConfig::load(&args.config, args.environment.as_deref())
        .with_context(|| format!("Failed to load {:?}", args.config))?;
    let payload = hex::decode(args.collector_payload.trim_start_matches("0x"))
        .context("Collector payload is not valid hex")?;

    let mut deployment = Deployment::build(&config).context("Failed to build deployment")?;
    info!("✅ Deployment built");

    let report = deployment.run(&Bytes::from(payload))?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}
