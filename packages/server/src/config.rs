use anyhow::{Context, Result};
use dotenvy::dotenv;
use market_data::FallbackPolicy;
use std::env;

pub const DEFAULT_CACHE_DATABASE_URL: &str = "sqlite://market-cache.db?mode=rwc";

/// Application configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    pub mls_api_key: String,
    pub mls_base_url: String,
    pub community_service_url: String,
    pub community_sync_secret: Option<String>,
    pub cache_database_url: String,
    pub community_fallback: FallbackPolicy,
    pub port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("mls_base_url", &self.mls_base_url)
            .field("community_service_url", &self.community_service_url)
            .field("cache_database_url", &self.cache_database_url)
            .field("community_fallback", &self.community_fallback)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            mls_api_key: required("MLS_API_KEY")?,
            mls_base_url: env::var("MLS_BASE_URL")
                .unwrap_or_else(|_| mls_client::DEFAULT_BASE_URL.to_string()),
            community_service_url: required("COMMUNITY_SERVICE_URL")?,
            community_sync_secret: env::var("COMMUNITY_SYNC_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            cache_database_url: env::var("CACHE_DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_CACHE_DATABASE_URL.to_string()),
            community_fallback: env::var("COMMUNITY_FALLBACK")
                .unwrap_or_else(|_| "rethrow".to_string())
                .parse()
                .context("COMMUNITY_FALLBACK must be `static` or `rethrow`")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
        })
    }

    /// Whether the cache lives in Postgres rather than SQLite.
    pub fn uses_postgres_cache(&self) -> bool {
        is_postgres_url(&self.cache_database_url)
    }
}

pub fn is_postgres_url(url: &str) -> bool {
    url.starts_with("postgres://") || url.starts_with("postgresql://")
}

fn required(name: &str) -> Result<String> {
    let value = env::var(name).with_context(|| format!("{} must be set", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} must not be empty", name);
    }
    Ok(value)
}
