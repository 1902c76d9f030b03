use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filters::{SearchFilters, DEFAULT_PAGE_SIZE};
use super::listing::Listing;
use super::stats::MarketStats;
use crate::geo::{LatLng, LngLat, Ring};

/// A named area definition, owned by the community configuration service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub kind: CommunityKind,
    /// Provider order, sent to the MLS.
    #[serde(default)]
    pub polygon: Option<Ring<LngLat>>,
    /// Rendering order, for maps.
    #[serde(default)]
    pub display_polygon: Option<Ring<LatLng>>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// Provider area/neighborhood name used when no polygon is known.
    #[serde(default)]
    pub area: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunityKind {
    #[default]
    Neighborhood,
    Zip,
    City,
}

impl Community {
    /// Minimal definition derived from a slug, used for zero-stats placeholders.
    pub fn from_slug(slug: &str) -> Self {
        let name = slug
            .split('-')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            name,
            slug: slug.to_string(),
            kind: CommunityKind::Neighborhood,
            polygon: None,
            display_polygon: None,
            county: None,
            featured: false,
            zip: None,
            city: None,
            area: None,
        }
    }

    /// Lowercase ASCII letters and digits in hyphen-separated runs, e.g. `west-lake-hills`.
    pub fn is_valid_slug(slug: &str) -> bool {
        !slug.is_empty()
            && slug
                .split('-')
                .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()))
    }

    /// Space-separated words of the slug, the secondary form used for text matching.
    pub fn slug_words(&self) -> String {
        self.slug
            .split(['-', '_'])
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Polygon-scoped filters. `None` for area-only communities.
    pub fn polygon_filters(&self, page_size: u32) -> Option<SearchFilters> {
        let polygon = self.polygon.as_ref()?;
        Some(SearchFilters {
            page_size,
            polygon: Some(polygon.closed()),
            zip: self.zip.clone(),
            ..SearchFilters::default()
        })
    }

    /// Name-based filters: the secondary search mode for communities without a
    /// polygon, and the fallback when a polygon query fails.
    pub fn area_filters(&self, page_size: u32) -> SearchFilters {
        let mut filters = SearchFilters {
            page_size,
            zip: self.zip.clone(),
            city: self.city.clone(),
            ..SearchFilters::default()
        };

        match self.kind {
            CommunityKind::Zip => {
                if filters.zip.is_none() {
                    filters.zip = Some(self.name.clone());
                }
            }
            CommunityKind::City => {
                if filters.city.is_none() {
                    filters.city = Some(self.name.clone());
                }
            }
            CommunityKind::Neighborhood => {
                filters.area = Some(self.area.clone().unwrap_or_else(|| self.name.clone()));
            }
        }
        filters
    }
}

/// Which data path produced an enriched result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchSource {
    /// Name/zip based query; the normal mode for area-only communities.
    Standard,
    /// Query scoped by the community polygon.
    PolygonEnhanced,
    /// Polygon query failed; name/zip based query used instead.
    StandardFallback,
}

/// A community with live market statistics attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCommunity {
    pub community: Community,
    pub stats: MarketStats,
    /// Leading listings of the query, for previews.
    pub listings: Vec<Listing>,
    pub source: SearchSource,
    /// Filters actually used for the listings query.
    pub filters: SearchFilters,
    /// True when enrichment failed and the stats are zeroed.
    #[serde(default)]
    pub placeholder: bool,
    pub enriched_at: DateTime<Utc>,
}

impl EnrichedCommunity {
    pub fn placeholder(community: Community) -> Self {
        let filters = community.area_filters(DEFAULT_PAGE_SIZE);
        Self {
            community,
            stats: MarketStats::default(),
            listings: Vec::new(),
            source: SearchSource::Standard,
            filters,
            placeholder: true,
            enriched_at: Utc::now(),
        }
    }
}

/// Listing-page query over the community catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommunityQuery {
    pub county: Option<String>,
    pub featured: Option<bool>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for CommunityQuery {
    fn default() -> Self {
        Self {
            county: None,
            featured: None,
            page: 1,
            page_size: 24,
        }
    }
}

impl CommunityQuery {
    pub fn matches(&self, community: &Community) -> bool {
        let county_ok = self.county.as_deref().map_or(true, |county| {
            community
                .county
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(county.trim()))
        });
        let featured_ok = self.featured.map_or(true, |f| community.featured == f);
        county_ok && featured_ok
    }

    /// Query-string form understood by the configuration service.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(county) = &self.county {
            params.push(("county".to_string(), county.clone()));
        }
        if let Some(featured) = self.featured {
            params.push(("featured".to_string(), featured.to_string()));
        }
        params
    }
}

/// One page of enriched communities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPage {
    pub communities: Vec<EnrichedCommunity>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}
