//! CLI for cache maintenance
//!
//! Sweeps expired rows, invalidates single entries, reports row counts and
//! pre-warms the community cache. Outputs JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use market_data::types::filters::MAX_PAGE_SIZE;
use market_data::{CacheKind, CacheWriteMode, CommunityQuery, MarketDataConfig};
use serde::Serialize;
use server_core::config::{Config, DEFAULT_CACHE_DATABASE_URL};
use server_core::server::{open_cache_store, AppState};
use std::collections::BTreeMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cache_cli")]
#[command(about = "Market data cache maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete expired rows
    Sweep {
        /// listings, communities or market-stats (default: all)
        #[arg(long)]
        kind: Option<CacheKind>,
    },

    /// Drop one cached entry
    Invalidate { kind: CacheKind, key: String },

    /// Row counts per cache table, expired rows included
    Count,

    /// Enrich every community so the first requests hit the cache
    Warm {
        #[arg(long)]
        county: Option<String>,
    },
}

#[derive(Serialize)]
struct Response {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    counts: BTreeMap<String, u64>,
}

impl Response {
    fn counts(counts: BTreeMap<String, u64>) -> Self {
        Self {
            success: true,
            message: None,
            counts,
        }
    }
}

fn output(resp: &Response) -> Result<()> {
    println!("{}", serde_json::to_string(resp)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,market_data=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let resp = match cli.command {
        Commands::Sweep { kind } => cmd_sweep(kind).await?,
        Commands::Invalidate { kind, key } => cmd_invalidate(kind, &key).await?,
        Commands::Count => cmd_count().await?,
        Commands::Warm { county } => cmd_warm(county).await?,
    };

    output(&resp)
}

/// Sweep, invalidate and count need only the cache URL, not the service credentials.
fn cache_database_url() -> String {
    let _ = dotenvy::dotenv();
    std::env::var("CACHE_DATABASE_URL").unwrap_or_else(|_| DEFAULT_CACHE_DATABASE_URL.to_string())
}

async fn cmd_sweep(kind: Option<CacheKind>) -> Result<Response> {
    let store = open_cache_store(&cache_database_url()).await?;
    let kinds = kind.map(|k| vec![k]).unwrap_or_else(|| CacheKind::ALL.to_vec());

    let mut counts = BTreeMap::new();
    for kind in kinds {
        let purged = store
            .purge_expired(kind)
            .await
            .with_context(|| format!("Failed to sweep {} cache", kind))?;
        counts.insert(kind.to_string(), purged);
    }
    Ok(Response::counts(counts))
}

async fn cmd_invalidate(kind: CacheKind, key: &str) -> Result<Response> {
    let store = open_cache_store(&cache_database_url()).await?;
    let removed = store
        .invalidate(kind, key)
        .await
        .with_context(|| format!("Failed to invalidate {} entry", kind))?;

    Ok(Response {
        success: removed,
        message: Some(if removed {
            format!("Removed {} entry '{}'", kind, key)
        } else {
            format!("No {} entry '{}'", kind, key)
        }),
        counts: BTreeMap::new(),
    })
}

async fn cmd_count() -> Result<Response> {
    let store = open_cache_store(&cache_database_url()).await?;

    let mut counts = BTreeMap::new();
    for kind in CacheKind::ALL {
        counts.insert(kind.to_string(), store.count(kind).await?);
    }
    Ok(Response::counts(counts))
}

async fn cmd_warm(county: Option<String>) -> Result<Response> {
    let config = Config::from_env().context("Failed to load configuration")?;
    // Writes must land before the process exits.
    let market_config = MarketDataConfig::default()
        .with_fallback(config.community_fallback)
        .with_cache_writes(CacheWriteMode::Inline);
    let state = AppState::with_market_config(&config, market_config).await?;

    let mut query = CommunityQuery {
        county,
        page_size: MAX_PAGE_SIZE,
        ..CommunityQuery::default()
    };

    let mut warmed = 0u64;
    let mut placeholders = 0u64;
    loop {
        let page = state.aggregator.list_page(&query).await?;
        warmed += page.communities.len() as u64;
        placeholders += page.communities.iter().filter(|c| c.placeholder).count() as u64;
        if !page.has_more {
            break;
        }
        query.page += 1;
    }

    let mut counts = BTreeMap::new();
    counts.insert("warmed".to_string(), warmed);
    counts.insert("placeholders".to_string(), placeholders);
    Ok(Response {
        success: placeholders == 0,
        message: Some(format!("Enriched {} communities", warmed)),
        counts,
    })
}
