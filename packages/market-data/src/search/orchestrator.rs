use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::matcher::{CommunityIndex, QueryMatcher};
use crate::communities::CommunityDirectory;
use crate::config::MarketDataConfig;
use crate::error::{MarketDataError, Result};
use crate::mls::ListingQuery;
use crate::retry::with_retry;
use crate::traits::{ListingProvider, NlpParser};
use crate::types::{Community, ListingStatus, SearchResults, TransactionType};

/// A free-text search, optionally continuing an NLP conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub prompt: String,
    #[serde(default, alias = "nlpId")]
    pub nlp_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub results: SearchResults,
    pub summary: Option<String>,
    pub nlp_id: Option<String>,
    pub matched_community: Option<Community>,
    pub zip: Option<String>,
    pub transaction: TransactionType,
}

/// Resolves free text into a listings query: local zip, community and intent
/// detection reconciled with the NLP endpoint's structured request. Results
/// are query-specific and bypass the community cache.
pub struct SearchOrchestrator {
    nlp: Arc<dyn NlpParser>,
    provider: Arc<dyn ListingProvider>,
    directory: Arc<CommunityDirectory>,
    matcher: QueryMatcher,
    index: RwLock<Option<Arc<CommunityIndex>>>,
    config: MarketDataConfig,
}

impl SearchOrchestrator {
    pub fn new(
        nlp: Arc<dyn NlpParser>,
        provider: Arc<dyn ListingProvider>,
        directory: Arc<CommunityDirectory>,
        config: MarketDataConfig,
    ) -> Result<Self> {
        let matcher = QueryMatcher::new(&config.zip_pattern)?;
        Ok(Self {
            nlp,
            provider,
            directory,
            matcher,
            index: RwLock::new(None),
            config,
        })
    }

    /// Compiled patterns for the directory's current list, rebuilt only when
    /// the directory hands back a different snapshot.
    async fn community_index(&self) -> Result<Arc<CommunityIndex>> {
        let communities = self.directory.all().await?;
        if let Some(index) = self.index.read().await.as_ref() {
            if Arc::ptr_eq(index.communities(), &communities) {
                return Ok(Arc::clone(index));
            }
        }

        let index = Arc::new(CommunityIndex::new(communities));
        *self.index.write().await = Some(Arc::clone(&index));
        Ok(index)
    }

    #[instrument(skip(self, request), fields(has_nlp_id = request.nlp_id.is_some()))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(MarketDataError::validation("search prompt must not be empty"));
        }
        let nlp_id = request.nlp_id.as_deref().filter(|id| !id.trim().is_empty());

        let zip = self.matcher.extract_zip(prompt);
        let transaction = self.matcher.transaction_type(prompt);
        let matched = match self.community_index().await {
            Ok(index) => index.find(prompt).cloned(),
            Err(e) => {
                warn!(error = %e, "Community list unavailable, searching without community matching");
                None
            }
        };
        debug!(
            zip = zip.as_deref(),
            community = matched.as_ref().map(|c| c.slug.as_str()),
            transaction = ?transaction,
            "Local prompt signals"
        );

        // A conversation id makes the NLP call stateful, so it is not retried.
        let nlp_policy = if nlp_id.is_some() {
            self.config.nlp_retry.without_retries()
        } else {
            self.config.nlp_retry
        };
        let parsed = with_retry("nlp", &nlp_policy, || self.nlp.parse(prompt, nlp_id)).await?;

        let query = reconcile(parsed.query, zip.as_deref(), matched.as_ref(), transaction);

        let results = with_retry("listings search", &self.config.listings_retry, || {
            self.provider.search(&query)
        })
        .await?;

        info!(
            total = results.total,
            returned = results.listings.len(),
            polygon = query.is_body_bearing(),
            "Search complete"
        );

        Ok(SearchOutcome {
            results,
            summary: parsed.summary,
            nlp_id: parsed.nlp_id,
            matched_community: matched,
            zip,
            transaction,
        })
    }
}

/// Merge locally detected signals into the NLP request.
///
/// A local zip fills in for a missing one and displaces a generic area. A
/// matched community polygon displaces any area or neighborhood filter and
/// moves the request to the body-bearing form. Transaction type always
/// follows the prompt's rental intent.
fn reconcile(
    mut query: ListingQuery,
    zip: Option<&str>,
    community: Option<&Community>,
    transaction: TransactionType,
) -> ListingQuery {
    if let Some(zip) = zip {
        if !query.has("zip") {
            query.set("zip", zip);
            query.remove("area");
        }
    }

    if let Some(community) = community {
        match &community.polygon {
            Some(ring) => {
                query.remove("area");
                query.remove("neighborhood");
                query = query.with_polygon(ring);
            }
            None => {
                if !query.has("zip") && !query.has("area") && !query.has("neighborhood") {
                    let area = community.area.clone().unwrap_or_else(|| community.name.clone());
                    query.set("area", area);
                }
            }
        }
    }

    query.set("type", transaction.provider_value());
    if !query.has("status") {
        query.set("status", ListingStatus::Active.provider_code());
    }
    query
}
