use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use news_collector::config;
use news_collector::pipeline;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean unprocessed raw news and fetch full articles for stub records"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    pipeline::run(&cfg).await?;
    Ok(())
}
