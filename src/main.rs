//! dntrends - domain-name market trend engine
//!
//! Loads domains, sales and groups from the trend store, computes per-group
//! price statistics and reconciles them into the `trends` table.
//!
//! # Usage
//! ```sh
//! TRENDS_STORE_URL=sqlite://data/trends.db TRENDS_STORE_KEY=... cargo run -- --dry-run
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use dntrends::application::bootstrap::PersistenceBootstrap;
use dntrends::application::trends::{
    ReconciliationPolicy, ResolutionStrategy, TrendPipeline,
};
use dntrends::config::Config;
use dntrends::domain::catalog::AffixPolicy;
use dntrends::domain::trends::{TrendGranularity, WindowAnchor};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Domain-name market trend engine", long_about = None)]
struct Cli {
    /// Read environment variables from this file instead of `.env`
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Reconciliation policy (upsert, full-replace)
    #[arg(long)]
    policy: Option<ReconciliationPolicy>,

    /// Let full-replace drop groups missing from the new batch
    #[arg(long)]
    allow_partial_snapshot: bool,

    /// Window anchor (latest-sale, run-date, YYYY-MM-DD)
    #[arg(long)]
    anchor: Option<WindowAnchor>,

    /// Output granularity (snapshot, monthly)
    #[arg(long)]
    granularity: Option<TrendGranularity>,

    /// Group resolution strategy (auto, membership, criteria)
    #[arg(long)]
    resolution: Option<ResolutionStrategy>,

    /// Affix matching (all, first)
    #[arg(long)]
    affix_match: Option<AffixPolicy>,

    /// Compute and plan without writing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    tracing_subscriber::registry()
        .with(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("dntrends {} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env()?;
    apply_overrides(&cli, &mut config);
    info!("Configuration loaded: {:?}", config.pipeline);

    let persistence = PersistenceBootstrap::init(&config.store).await?;
    let pipeline = TrendPipeline::new(
        persistence.market_data.clone(),
        persistence.trend_store.clone(),
        config.pipeline.to_settings(cli.dry_run),
    );

    let outcome = pipeline.run(Utc::now().date_naive()).await;
    persistence.db.close().await;
    let report = outcome?;

    if cli.dry_run {
        warn!("Dry run: nothing was written to the trend store");
    }
    info!("Run report:\n{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    let pipeline = &mut config.pipeline;
    if let Some(policy) = cli.policy {
        pipeline.policy = policy;
    }
    if cli.allow_partial_snapshot {
        pipeline.allow_partial_snapshot = true;
    }
    if let Some(anchor) = cli.anchor {
        pipeline.anchor = anchor;
    }
    if let Some(granularity) = cli.granularity {
        pipeline.granularity = granularity;
    }
    if let Some(resolution) = cli.resolution {
        pipeline.resolution = resolution;
    }
    if let Some(affix_policy) = cli.affix_match {
        pipeline.affix_policy = affix_policy;
    }
}

/// `RUST_LOG` wins when it parses, otherwise `info`
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_log_filter_honours_rust_log() {
        assert_eq!(
            log_filter(Some("debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            log_filter(Some("dntrends=trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            log_filter(Some("[[not a filter")).max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }
}
