use async_trait::async_trait;

use crate::error::{MarketDataError, Result};
use crate::traits::{CommunitySource, SyncReport};
use crate::types::{Community, CommunityQuery};

const BUNDLED: &str = include_str!("../../data/communities.json");

/// Read-only community dataset shipped with the crate, served when the
/// configuration service is down and the fallback policy allows it.
#[derive(Debug, Clone)]
pub struct StaticCommunities {
    communities: Vec<Community>,
}

impl StaticCommunities {
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED)
    }

    /// Strict JSON: an invalid ring or unknown shape fails the whole dataset.
    pub fn from_json(raw: &str) -> Result<Self> {
        let communities: Vec<Community> = serde_json::from_str(raw)?;
        Ok(Self::new(communities))
    }

    /// Derives `display_polygon` wherever only the provider ring is present.
    pub fn new(communities: Vec<Community>) -> Self {
        let communities = communities
            .into_iter()
            .map(|mut c| {
                if c.display_polygon.is_none() {
                    c.display_polygon = c.polygon.as_ref().map(|p| p.to_display());
                }
                c
            })
            .collect();
        Self { communities }
    }

    pub fn communities(&self) -> &[Community] {
        &self.communities
    }
}

#[async_trait]
impl CommunitySource for StaticCommunities {
    async fn list(&self, query: &CommunityQuery) -> Result<Vec<Community>> {
        Ok(self
            .communities
            .iter()
            .filter(|c| query.matches(c))
            .cloned()
            .collect())
    }

    async fn get(&self, slug: &str) -> Result<Option<Community>> {
        Ok(self.communities.iter().find(|c| c.slug == slug).cloned())
    }

    async fn sync(&self, _communities: &[Community]) -> Result<SyncReport> {
        Err(MarketDataError::Config(
            "the static community dataset is read-only".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommunityKind;

    #[test]
    fn test_bundled_dataset_parses() {
        let dataset = StaticCommunities::bundled().unwrap();
        assert!(dataset.communities().len() >= 10);

        let zilker = dataset.communities().iter().find(|c| c.slug == "zilker").unwrap();
        let polygon = zilker.polygon.as_ref().unwrap();
        let display = zilker.display_polygon.as_ref().unwrap();
        assert_eq!(polygon.len(), display.len());
        assert_eq!(display.points()[0].lat, polygon.points()[0].lat);
    }

    #[test]
    fn test_bundled_slugs_are_unique() {
        let dataset = StaticCommunities::bundled().unwrap();
        let mut slugs: Vec<_> = dataset.communities().iter().map(|c| c.slug.as_str()).collect();
        slugs.sort_unstable();
        let before = slugs.len();
        slugs.dedup();
        assert_eq!(before, slugs.len());
        assert!(slugs.iter().all(|slug| Community::is_valid_slug(slug)));
    }

    #[tokio::test]
    async fn test_list_applies_query_filters() {
        let dataset = StaticCommunities::bundled().unwrap();
        let query = CommunityQuery {
            county: Some("williamson".into()),
            ..CommunityQuery::default()
        };

        let found = dataset.list(&query).await.unwrap();
        assert!(!found.is_empty());
        assert!(found.iter().all(|c| c.county.as_deref() == Some("Williamson")));
        assert!(found.iter().all(|c| c.kind == CommunityKind::City));
    }

    #[test]
    fn test_short_ring_rejects_dataset() {
        let raw = r#"[{"name":"Bad","slug":"bad","polygon":[[-97.7,30.2],[-97.6,30.2]]}]"#;
        assert!(StaticCommunities::from_json(raw).is_err());
    }

    #[tokio::test]
    async fn test_static_dataset_is_read_only() {
        let dataset = StaticCommunities::new(Vec::new());
        assert!(matches!(dataset.sync(&[]).await, Err(MarketDataError::Config(_))));
    }
}
