use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Community, CommunityQuery};

/// Community definitions, owned by an external configuration store.
#[async_trait]
pub trait CommunitySource: Send + Sync {
    /// Every community matching the query's filters. Pagination is applied by the caller.
    async fn list(&self, query: &CommunityQuery) -> Result<Vec<Community>>;

    /// `Ok(None)` means no such community, not a failure.
    async fn get(&self, slug: &str) -> Result<Option<Community>>;

    /// Upsert a batch of definitions.
    async fn sync(&self, communities: &[Community]) -> Result<SyncReport>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    #[serde(default)]
    pub created: usize,
    #[serde(default)]
    pub updated: usize,
}

impl std::ops::AddAssign for SyncReport {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.updated += other.updated;
    }
}
