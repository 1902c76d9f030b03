//! Runtime configuration for the market-data services.

use std::time::Duration;

/// Default zip pattern: five-digit codes in the Austin metro `78xxx` range.
pub const DEFAULT_ZIP_PATTERN: &str = r"\b(78\d{3})\b";

const DEFAULT_BATCH_CONCURRENCY: usize = 50;
const DEFAULT_STATS_SAMPLE_SIZE: u32 = 100;
const DEFAULT_PREVIEW_LISTINGS: usize = 12;

#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub ttls: CacheTtls,
    /// Budget for the natural-language parsing call.
    pub nlp_retry: RetryPolicy,
    /// Budget for listings queries issued by search and enrichment.
    pub listings_retry: RetryPolicy,
    /// Per-attempt deadline for a community configuration lookup.
    pub enrichment_timeout: Duration,
    /// Maximum enrichments in flight during a batch.
    pub batch_concurrency: usize,
    /// Listings fetched per area to compute statistics.
    pub stats_sample_size: u32,
    /// Listings kept on an enriched community for previews.
    pub preview_listings: usize,
    pub zip_pattern: String,
    /// Lifetime of the memoized community list used for text matching.
    pub directory_ttl: Duration,
    pub fallback: FallbackPolicy,
    pub cache_writes: CacheWriteMode,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            ttls: CacheTtls::default(),
            nlp_retry: RetryPolicy::new(Duration::from_secs(12), 1),
            listings_retry: RetryPolicy::new(Duration::from_secs(8), 2),
            enrichment_timeout: Duration::from_secs(8),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            stats_sample_size: DEFAULT_STATS_SAMPLE_SIZE,
            preview_listings: DEFAULT_PREVIEW_LISTINGS,
            zip_pattern: DEFAULT_ZIP_PATTERN.to_string(),
            directory_ttl: Duration::from_secs(10 * 60),
            fallback: FallbackPolicy::default(),
            cache_writes: CacheWriteMode::default(),
        }
    }
}

impl MarketDataConfig {
    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    pub fn with_nlp_retry(mut self, policy: RetryPolicy) -> Self {
        self.nlp_retry = policy;
        self
    }

    pub fn with_listings_retry(mut self, policy: RetryPolicy) -> Self {
        self.listings_retry = policy;
        self
    }

    pub fn with_enrichment_timeout(mut self, timeout: Duration) -> Self {
        self.enrichment_timeout = timeout;
        self
    }

    /// Clamped to at least one.
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency.max(1);
        self
    }

    pub fn with_stats_sample_size(mut self, size: u32) -> Self {
        self.stats_sample_size = size;
        self
    }

    pub fn with_zip_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.zip_pattern = pattern.into();
        self
    }

    pub fn with_directory_ttl(mut self, ttl: Duration) -> Self {
        self.directory_ttl = ttl;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_cache_writes(mut self, mode: CacheWriteMode) -> Self {
        self.cache_writes = mode;
        self
    }
}

/// Time-to-live per cache kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub listings: Duration,
    pub communities: Duration,
    pub market_stats: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            listings: Duration::from_secs(60 * 60),
            communities: Duration::from_secs(24 * 60 * 60),
            market_stats: Duration::from_secs(6 * 60 * 60),
        }
    }
}

/// Per-attempt timeout plus a bounded number of retries with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    /// Delay before retry `n` is `retry_delay * n`.
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
            retry_delay: Duration::from_millis(250),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn without_retries(mut self) -> Self {
        self.max_retries = 0;
        self
    }
}

/// What the aggregator does when the community configuration service fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Surface the failure to the caller.
    #[default]
    Rethrow,
    /// Serve the bundled static community dataset instead.
    StaticDataset,
}

impl std::str::FromStr for FallbackPolicy {
    type Err = crate::error::MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rethrow" | "" => Ok(FallbackPolicy::Rethrow),
            "static" | "static-dataset" => Ok(FallbackPolicy::StaticDataset),
            other => Err(crate::error::MarketDataError::Config(format!(
                "unknown community fallback policy {other:?} (expected \"static\" or \"rethrow\")"
            ))),
        }
    }
}

/// How cache writes relate to the request that produced them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheWriteMode {
    /// Spawned onto the runtime; the response never waits for the write.
    #[default]
    Detached,
    /// Awaited before returning. Failures are still only logged.
    Inline,
}
