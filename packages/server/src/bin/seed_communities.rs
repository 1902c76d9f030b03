//! Push community definitions from a seed file to the configuration service.
//!
//! The seed file is strict JSON: either an array of communities or an object
//! with a `communities` array. Polygons are `[lng, lat]` pairs; each ring is
//! validated and closed, and `displayPolygon` is derived from it. Communities
//! without a polygon can have one filled from the MLS boundary lookup.

use anyhow::{Context, Result};
use clap::Parser;
use market_data::{
    BoundaryLookup, Community, CommunityKind, CommunitySource, HttpCommunitySource, LngLat,
    MlsQueryClient, Ring, SyncReport,
};
use mls_client::MlsClient;
use serde::Deserialize;
use server_core::config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "seed_communities")]
#[command(about = "Sync community definitions to the configuration service")]
struct Cli {
    /// Seed file
    #[arg(long, default_value = "packages/market-data/data/communities.json")]
    file: PathBuf,

    /// Fill missing neighborhood polygons from the MLS boundary lookup
    #[arg(long)]
    lookup_boundaries: bool,

    /// Validate and print, without syncing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Wrapped { communities: Vec<SeedCommunity> },
    Bare(Vec<SeedCommunity>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SeedCommunity {
    name: String,
    slug: String,
    #[serde(default)]
    kind: CommunityKind,
    #[serde(default)]
    polygon: Option<Vec<[f64; 2]>>,
    /// Ignored: always derived from `polygon`.
    #[serde(default)]
    #[allow(dead_code)]
    display_polygon: Option<serde_json::Value>,
    #[serde(default)]
    county: Option<String>,
    #[serde(default)]
    featured: bool,
    #[serde(default)]
    zip: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    area: Option<String>,
}

impl SeedCommunity {
    fn into_community(self) -> Result<Community> {
        let slug = self.slug.trim().to_string();
        if slug.is_empty() || self.name.trim().is_empty() {
            anyhow::bail!("community {:?} needs a name and a slug", self.name);
        }
        if !Community::is_valid_slug(&slug) {
            anyhow::bail!(
                "slug '{}' must be lowercase letters and digits separated by single hyphens",
                slug
            );
        }

        let polygon = match self.polygon {
            Some(points) => {
                let ring = Ring::new(points.into_iter().map(LngLat::from).collect())
                    .with_context(|| format!("invalid polygon for '{}'", slug))?;
                Some(ring.closed())
            }
            None => None,
        };

        Ok(Community {
            name: self.name.trim().to_string(),
            display_polygon: polygon.as_ref().map(|ring| ring.to_display()),
            slug,
            kind: self.kind,
            polygon,
            county: self.county,
            featured: self.featured,
            zip: self.zip,
            city: self.city,
            area: self.area,
        })
    }
}

fn parse_seed(raw: &str) -> Result<Vec<Community>> {
    let seed: SeedFile = serde_json::from_str(raw).context("Failed to parse seed data")?;
    let entries = match seed {
        SeedFile::Wrapped { communities } => communities,
        SeedFile::Bare(communities) => communities,
    };

    let mut seen = std::collections::HashSet::new();
    let mut communities = Vec::with_capacity(entries.len());
    for entry in entries {
        let community = entry.into_community()?;
        if !seen.insert(community.slug.clone()) {
            anyhow::bail!("duplicate slug '{}'", community.slug);
        }
        communities.push(community);
    }
    Ok(communities)
}

async fn fill_boundaries(lookup: &dyn BoundaryLookup, communities: &mut [Community]) -> usize {
    let mut filled = 0;
    for community in communities
        .iter_mut()
        .filter(|c| c.polygon.is_none() && c.kind == CommunityKind::Neighborhood)
    {
        let name = community.area.clone().unwrap_or_else(|| community.name.clone());
        match lookup.neighborhood_boundary(&name, community.city.as_deref()).await {
            Ok(Some(ring)) => {
                let ring = ring.closed();
                community.display_polygon = Some(ring.to_display());
                community.polygon = Some(ring);
                filled += 1;
            }
            Ok(None) => println!("  - no boundary found for '{}'", community.slug),
            Err(e) => println!("  ! boundary lookup failed for '{}': {}", community.slug, e),
        }
    }
    filled
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,market_data=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let raw = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("Failed to read seed file {}", cli.file.display()))?;
    let mut communities = parse_seed(&raw)?;
    println!("✓ Loaded {} communities from {}", communities.len(), cli.file.display());

    let config = Config::from_env().context("Failed to load configuration")?;

    if cli.lookup_boundaries {
        let mls = MlsClient::new(config.mls_base_url.as_str(), config.mls_api_key.as_str())
            .context("Failed to create MLS client")?;
        let lookup = MlsQueryClient::new(mls);
        let filled = fill_boundaries(&lookup, &mut communities).await;
        println!("✓ Filled {} polygons from boundary lookup", filled);
    }

    let with_polygon = communities.iter().filter(|c| c.polygon.is_some()).count();
    println!(
        "  {} with polygons, {} area-only",
        with_polygon,
        communities.len() - with_polygon
    );

    if cli.dry_run {
        println!("{}", serde_json::to_string_pretty(&communities)?);
        return Ok(());
    }

    let secret = config
        .community_sync_secret
        .clone()
        .context("COMMUNITY_SYNC_SECRET must be set to sync")?;
    let source = HttpCommunitySource::new(&config.community_service_url)
        .context("Invalid COMMUNITY_SERVICE_URL")?
        .with_sync_secret(secret);

    let SyncReport { created, updated } = source
        .sync(&communities)
        .await
        .context("Community sync failed")?;

    println!("\n✓ Sync complete: {} created, {} updated", created, updated);
    Ok(())
}
