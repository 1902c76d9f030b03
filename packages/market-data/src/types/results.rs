use serde::{Deserialize, Serialize};

use super::listing::Listing;

/// One page of normalized search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub listings: Vec<Listing>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    /// `page < total_pages`, independent of how many rows came back.
    pub has_more: bool,
    /// Provider-reported list price extrema across the whole result set.
    pub price_bounds: Option<PriceBounds>,
}

impl SearchResults {
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            listings: Vec::new(),
            total: 0,
            page,
            page_size,
            total_pages: 0,
            has_more: false,
            price_bounds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub min: i64,
    pub max: i64,
}
