use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::Result;
use crate::retry::with_retry;
use crate::traits::CommunitySource;
use crate::types::{Community, CommunityQuery};

/// Deadline for one refresh of the community list.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(8);

/// Memoized full community list, refreshed after `ttl`.
///
/// Constructed by the application and handed to whatever needs the list;
/// there is no process-wide instance. Each refresh is bounded by
/// `refresh_timeout`. A failed or timed-out refresh keeps serving the
/// previous list when one exists, and callers holding a stale list do not
/// wait on a refresh already in flight.
pub struct CommunityDirectory {
    source: Arc<dyn CommunitySource>,
    ttl: Duration,
    refresh_timeout: Duration,
    state: RwLock<Option<Snapshot>>,
    refresh: Mutex<()>,
}

struct Snapshot {
    fetched_at: Instant,
    communities: Arc<Vec<Community>>,
}

impl CommunityDirectory {
    pub fn new(source: Arc<dyn CommunitySource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            state: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub async fn all(&self) -> Result<Arc<Vec<Community>>> {
        if let Some(communities) = self.fresh().await {
            return Ok(communities);
        }

        let _refresh = match self.refresh.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if let Some(stale) = self.cached().await {
                    return Ok(stale);
                }
                self.refresh.lock().await
            }
        };
        if let Some(communities) = self.fresh().await {
            return Ok(communities);
        }

        let query = CommunityQuery::default();
        let policy = RetryPolicy::new(self.refresh_timeout, 0);
        match with_retry("community directory", &policy, || self.source.list(&query)).await {
            Ok(communities) => {
                debug!(count = communities.len(), "Community directory refreshed");
                let communities = Arc::new(communities);
                *self.state.write().await = Some(Snapshot {
                    fetched_at: Instant::now(),
                    communities: Arc::clone(&communities),
                });
                Ok(communities)
            }
            Err(e) => match self.cached().await {
                Some(stale) => {
                    warn!(error = %e, "Community directory refresh failed, serving stale list");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    pub async fn invalidate(&self) {
        *self.state.write().await = None;
    }

    async fn fresh(&self) -> Option<Arc<Vec<Community>>> {
        let state = self.state.read().await;
        state
            .as_ref()
            .filter(|snapshot| snapshot.fetched_at.elapsed() < self.ttl)
            .map(|snapshot| Arc::clone(&snapshot.communities))
    }

    async fn cached(&self) -> Option<Arc<Vec<Community>>> {
        let state = self.state.read().await;
        state.as_ref().map(|snapshot| Arc::clone(&snapshot.communities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarketDataError;
    use crate::testing::MockCommunitySource;

    #[tokio::test]
    async fn test_list_is_memoized_within_ttl() {
        let source = Arc::new(MockCommunitySource::new().with_community(Community::from_slug("zilker")));
        let directory = CommunityDirectory::new(source.clone(), Duration::from_secs(60));

        assert_eq!(directory.all().await.unwrap().len(), 1);
        assert_eq!(directory.all().await.unwrap().len(), 1);
        assert_eq!(source.list_calls(), 1);

        directory.invalidate().await;
        directory.all().await.unwrap();
        assert_eq!(source.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_serves_stale_list() {
        let source = Arc::new(MockCommunitySource::new().with_community(Community::from_slug("zilker")));
        let directory = CommunityDirectory::new(source.clone(), Duration::ZERO);

        directory.all().await.unwrap();
        source.fail_with(MarketDataError::Network("connection refused".into()));

        let stale = directory.all().await.unwrap();
        assert_eq!(stale[0].slug, "zilker");
        assert_eq!(source.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_first_failure_propagates() {
        let source = Arc::new(MockCommunitySource::new());
        source.fail_with(MarketDataError::Network("connection refused".into()));
        let directory = CommunityDirectory::new(source, Duration::from_secs(60));

        assert!(directory.all().await.is_err());
    }

    #[tokio::test]
    async fn test_hung_source_times_out() {
        let source = Arc::new(
            MockCommunitySource::new()
                .with_community(Community::from_slug("zilker"))
                .with_delay(Duration::from_secs(3600)),
        );
        let directory =
            CommunityDirectory::new(source, Duration::from_secs(60)).with_refresh_timeout(Duration::from_millis(50));

        let result = tokio::time::timeout(Duration::from_secs(5), directory.all())
            .await
            .expect("refresh should be bounded by its own deadline");
        assert!(matches!(result, Err(MarketDataError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_hung_refresh_serves_stale_list() {
        let source = Arc::new(
            MockCommunitySource::new()
                .with_community(Community::from_slug("mueller"))
                .with_delay(Duration::from_secs(3600)),
        );
        let directory = Arc::new(
            CommunityDirectory::new(source, Duration::ZERO).with_refresh_timeout(Duration::from_millis(200)),
        );
        *directory.state.write().await = Some(Snapshot {
            fetched_at: Instant::now(),
            communities: Arc::new(vec![Community::from_slug("zilker")]),
        });

        let refreshing = {
            let directory = Arc::clone(&directory);
            tokio::spawn(async move { directory.all().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // A refresh is in flight; this caller gets the stale list without waiting.
        let started = Instant::now();
        let concurrent = directory.all().await.unwrap();
        assert_eq!(concurrent[0].slug, "zilker");
        assert!(started.elapsed() < Duration::from_millis(150));

        let after_timeout = refreshing.await.unwrap().unwrap();
        assert_eq!(after_timeout[0].slug, "zilker");
    }
}
