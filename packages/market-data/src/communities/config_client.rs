//! Client for the external community configuration service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{MarketDataError, Result, Service};
use crate::traits::{CommunitySource, SyncReport};
use crate::types::{Community, CommunityQuery};

/// Header carrying the shared secret on `POST /communities/sync`.
pub const SYNC_SECRET_HEADER: &str = "x-sync-secret";

/// Transport-level ceiling on any single request to the service.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Communities sent per sync request.
pub const SYNC_BATCH_SIZE: usize = 50;

#[derive(Clone)]
pub struct HttpCommunitySource {
    client: reqwest::Client,
    base_url: Url,
    sync_secret: Option<String>,
}

impl std::fmt::Debug for HttpCommunitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCommunitySource")
            .field("base_url", &self.base_url.as_str())
            .field("sync_secret", &self.sync_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The service answers either with a bare payload or wrapped in an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum CommunityList {
    Wrapped { communities: Vec<Community> },
    Bare(Vec<Community>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SingleCommunity {
    Wrapped { community: Community },
    Bare(Community),
}

#[derive(Serialize)]
struct SyncBody<'a> {
    communities: &'a [Community],
}

impl HttpCommunitySource {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| MarketDataError::Config(format!("invalid community service url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(MarketDataError::Config(format!(
                "community service url {base_url} cannot be a base"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MarketDataError::Config(format!("failed to build community service client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            sync_secret: None,
        })
    }

    pub fn with_sync_secret(mut self, secret: impl Into<String>) -> Self {
        self.sync_secret = Some(secret.into()).filter(|s: &String| !s.trim().is_empty());
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MarketDataError::Upstream {
                service: Service::CommunityConfig,
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl CommunitySource for HttpCommunitySource {
    #[tracing::instrument(skip(self, query))]
    async fn list(&self, query: &CommunityQuery) -> Result<Vec<Community>> {
        let resp = self
            .client
            .get(self.endpoint(&["communities"]))
            .query(&query.to_params())
            .send()
            .await?;

        let communities = match Self::decode::<CommunityList>(resp).await? {
            CommunityList::Wrapped { communities } | CommunityList::Bare(communities) => communities,
        };
        debug!(count = communities.len(), "Fetched community list");
        Ok(communities)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, slug: &str) -> Result<Option<Community>> {
        let resp = self
            .client
            .get(self.endpoint(&["communities", slug]))
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        match Self::decode::<SingleCommunity>(resp).await? {
            SingleCommunity::Wrapped { community } | SingleCommunity::Bare(community) => Ok(Some(community)),
        }
    }

    #[tracing::instrument(skip(self, communities), fields(count = communities.len()))]
    async fn sync(&self, communities: &[Community]) -> Result<SyncReport> {
        let secret = self
            .sync_secret
            .as_deref()
            .ok_or_else(|| MarketDataError::Config("community sync secret is not configured".into()))?;

        let mut report = SyncReport::default();
        for (index, batch) in communities.chunks(SYNC_BATCH_SIZE).enumerate() {
            let resp = self
                .client
                .post(self.endpoint(&["communities", "sync"]))
                .header(SYNC_SECRET_HEADER, secret)
                .json(&SyncBody { communities: batch })
                .send()
                .await?;

            let batch_report: SyncReport = Self::decode(resp).await?;
            info!(
                batch = index + 1,
                size = batch.len(),
                created = batch_report.created,
                updated = batch_report.updated,
                "Synced community batch"
            );
            report += batch_report;
        }
        Ok(report)
    }
}
