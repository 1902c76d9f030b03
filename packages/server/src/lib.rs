// Market Data API - Server Core
//
// HTTP surface over the market-data library: community enrichment, listing
// search and detail, area market statistics, and free-text search.

pub mod config;
pub mod server;

pub use config::*;
